pub mod override_file;
