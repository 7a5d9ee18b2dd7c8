use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub listen_port: u16,
    pub shared_root: String,
    pub banner_file: Option<String>,
    pub upload_buffer_size: Option<usize>,   // Optional to allow default value
    pub download_buffer_size: Option<usize>, // Optional to allow default value
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: String::from("0.0.0.0"),
            listen_port: 2121,
            shared_root: String::from("/srv/ferroftp"),
            banner_file: None,
            upload_buffer_size: Some(crate::constants::UPLOAD_CHUNK_SIZE),
            download_buffer_size: Some(crate::constants::DOWNLOAD_CHUNK_SIZE),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    pub fn upload_chunk(&self) -> usize {
        self.server
            .upload_buffer_size
            .unwrap_or(crate::constants::UPLOAD_CHUNK_SIZE)
    }

    pub fn download_chunk(&self) -> usize {
        self.server
            .download_buffer_size
            .unwrap_or(crate::constants::DOWNLOAD_CHUNK_SIZE)
    }
}
