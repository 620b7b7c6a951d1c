pub mod file_detection;
pub mod logging;
pub mod paths;
pub mod test_helpers;
