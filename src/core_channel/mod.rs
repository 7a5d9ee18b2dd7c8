pub mod channel;

pub use channel::{split, ChannelReader, ChannelWriter};
