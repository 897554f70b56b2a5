mod pairing_steps;
mod round_steps;
