pub mod inspect;
pub mod timeline;
pub mod verify;
