pub mod backend;
pub mod keep_alive;
pub mod local_model;
pub mod openai;
