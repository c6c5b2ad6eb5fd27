pub mod colors;
pub mod panels;
pub mod particles;
pub mod rng;
pub mod time;
pub mod tutorials;
pub mod ui;
