use crate::utils::consts::{CHANNELS_PER_MODULE, CHANNELS_PER_SITE};

/// Physical location of one channel: the site (plug-in board slot) and the
/// channel number on that site, 1..=8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteAddress {
    pub site: u32,
    pub channel: u32,
}

/// Map a logical (module, channel 1..=16) pair to its physical site address.
///
/// A 16-channel module spans two sites; channels 9..=16 live on the next
/// site as channels 1..=8. Every place that talks to the instrument or
/// indexes results goes through here, so the arithmetic cannot drift apart
/// between call sites.
pub fn resolve(module: u32, channel: u32) -> SiteAddress {
    debug_assert!((1..=CHANNELS_PER_MODULE).contains(&channel));
    if channel > CHANNELS_PER_SITE {
        SiteAddress { site: module + 1, channel: channel - CHANNELS_PER_SITE }
    } else {
        SiteAddress { site: module, channel }
    }
}

/// Carrier-wide channel number used by the per-channel data server,
/// computed from the resolved site address.
pub fn carrier_channel(module: u32, channel: u32) -> u32 {
    let addr = resolve(module, channel);
    (addr.site - 1) * CHANNELS_PER_SITE + addr.channel
}

/// Run-wide channel index used to key measurements and the CMRR table,
/// 1..=16 for module 1, 17..=32 for module 2, and so on.
pub fn channel_index(module: u32, channel: u32) -> usize {
    debug_assert!(module >= 1);
    debug_assert!((1..=CHANNELS_PER_MODULE).contains(&channel));
    ((module - 1) * CHANNELS_PER_MODULE + channel) as usize
}

/// Inverse of [`channel_index`].
pub fn module_and_channel(channel_index: usize) -> (u32, u32) {
    debug_assert!(channel_index >= 1);
    let zero_based = (channel_index - 1) as u32;
    (
        zero_based / CHANNELS_PER_MODULE + 1,
        zero_based % CHANNELS_PER_MODULE + 1,
    )
}
