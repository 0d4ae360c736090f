pub mod db;
pub mod repositories;
pub mod rooms;
pub mod auth;
pub mod earnings;
