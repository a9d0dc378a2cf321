//! Route modules for the ZIP comparison server

pub mod compare;
