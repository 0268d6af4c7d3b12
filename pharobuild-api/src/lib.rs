pub mod build;
pub mod config;
pub mod constants;
pub mod vm;

#[cfg(test)]
mod test_common;
