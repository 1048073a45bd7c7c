pub mod inspect;
pub mod unwrap;
