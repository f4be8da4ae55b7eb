//! Layer visibility masks
//!
//! Objects and cameras each carry a [`LayerMask`]. An object is drawn by a
//! camera only when the two masks share at least one channel.

use bitflags::bitflags;

/// Channel every object and camera starts on
pub const DEFAULT_CHANNEL: u32 = 0;

/// Channel marking objects that take part in the glow isolation pass
pub const BLOOM_CHANNEL: u32 = 1;

/// Number of addressable channels
pub const CHANNEL_COUNT: u32 = 32;

bitflags! {
    /// 32-channel visibility mask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LayerMask: u32 {
        const DEFAULT = 1 << DEFAULT_CHANNEL;
        const BLOOM = 1 << BLOOM_CHANNEL;
        const ALL = !0;
    }
}

impl LayerMask {
    /// Mask with exactly one channel enabled
    pub fn channel(channel: u32) -> Self {
        debug_assert!(channel < CHANNEL_COUNT, "layer channel {channel} out of range");
        Self::from_bits_retain(1 << (channel % CHANNEL_COUNT))
    }

    /// Restrict the mask to a single channel
    pub fn set_channel(&mut self, channel: u32) {
        *self = Self::channel(channel);
    }

    pub fn enable_channel(&mut self, channel: u32) {
        self.insert(Self::channel(channel));
    }

    pub fn disable_channel(&mut self, channel: u32) {
        self.remove(Self::channel(channel));
    }

    pub fn enable_all(&mut self) {
        *self = Self::ALL;
    }

    pub fn has_channel(&self, channel: u32) -> bool {
        self.contains(Self::channel(channel))
    }

    /// True when the masks share at least one channel
    pub fn test(&self, other: LayerMask) -> bool {
        self.intersects(other)
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::DEFAULT
    }
}
