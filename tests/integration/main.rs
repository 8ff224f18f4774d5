mod config_bean;
mod error_handling;
mod planning;
