pub mod clock;
pub mod db;
pub mod file_utils;
