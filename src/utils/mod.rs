pub mod conf_helper;
pub mod literal;
