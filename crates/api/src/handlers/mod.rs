pub mod hexagram;
pub mod login_errors;
