pub mod enroll;
pub mod info;
pub mod init;
pub mod list;
pub mod remove;
pub mod rotate;
pub mod show;
pub mod verify;
