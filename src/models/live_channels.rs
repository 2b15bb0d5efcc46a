//! Live channel result model implementations

use crate::models::LiveChannels;

impl LiveChannels {
    /// Programmes for a channel by its match key
    pub fn programs_for(&self, match_key: &str) -> &[crate::models::EpgProgram] {
        self.epgs.get(match_key).map(Vec::as_slice).unwrap_or(&[])
    }
}
