pub mod ride;
pub mod seats;
pub mod user;
