mod home;

pub use home::*;
