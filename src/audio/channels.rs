//! Channel layout metadata offered to the presentation layer

use serde::{Deserialize, Serialize};

/// Named channel layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfiguration {
    /// Menu group the layout belongs to
    pub group: String,

    /// Full display label
    pub label: String,

    /// Compact label for narrow displays
    pub short_label: String,
}

impl ChannelConfiguration {
    fn new(group: &str, label: &str, short_label: &str) -> Self {
        Self {
            group: group.to_string(),
            label: label.to_string(),
            short_label: short_label.to_string(),
        }
    }
}

/// Return the supported channel layouts, in menu order
pub fn channel_configurations() -> Vec<ChannelConfiguration> {
    vec![
        ChannelConfiguration::new("mono Stereo Configuration", "Mono", "Mono"),
        ChannelConfiguration::new("mono Stereo Configuration", "Stereo", "Stereo"),
        ChannelConfiguration::new("5.1 Surround", "5.1 DTS - (L, R, Ls, Rs, C, LFE)", "5.1 DTS"),
        ChannelConfiguration::new("5.1 ITU", "5.1 DTS - (L, R, C, LFE, Ls, Rs)", "5.1 ITU"),
        ChannelConfiguration::new("5.1 FILM", "5.1 DTS - (L, C, R, Ls, Rs, LFE)", "5.1 FILM"),
    ]
}
