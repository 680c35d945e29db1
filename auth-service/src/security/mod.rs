pub mod lockout;
pub mod password;
