//! Gran Turismo 7 packet sources: Salsa20 decipher, the "A" packet layout,
//! the live console session, capture replay and the client loop tying them
//! together.

pub mod cipher;
pub mod client;
pub mod live;
pub mod replay;
pub mod schema;

pub use cipher::{decipher, decipher_in_place, MAGIC};
pub use client::{ClientState, GtClient};
pub use live::{LiveConfig, LiveSession};
pub use replay::{Framer, ReplayReader, REPLAY_INTERVAL};
pub use schema::{FrameDecoder, Gt7PacketDecoder, MIN_FRAME_LEN, PACKET_LEN};
