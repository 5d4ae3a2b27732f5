pub mod import;
pub mod list;
pub mod top;
pub mod view;
