pub mod base;
pub mod whatsapp;
