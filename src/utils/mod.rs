pub mod datetime;
pub mod env;
pub mod keyed_lock;
pub mod telegram;

#[cfg(test)]
pub mod test_utils;
