pub mod chat;
pub mod create_contact;
pub mod create_group;
pub mod migrate;
pub mod onboard;
pub mod status;
