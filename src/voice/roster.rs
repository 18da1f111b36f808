use std::collections::HashMap;

use crate::{
    common::types::{ChannelId, MemberId, MemberRef},
    voice::events::{MemberVoiceState, VoiceState},
};

#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub member: MemberRef,
    pub channel: ChannelId,
    pub self_deaf: bool,
}

/// Who sits in which voice channel of one guild, built from voice events.
#[derive(Debug, Default)]
pub struct Roster {
    entries: HashMap<MemberId, RosterEntry>,
}

impl Roster {
    pub fn apply(&mut self, member: &MemberRef, state: VoiceState) {
        match state.channel_id {
            Some(channel) => {
                self.entries.insert(
                    member.id,
                    RosterEntry {
                        member: member.clone(),
                        channel,
                        self_deaf: state.self_deaf,
                    },
                );
            }
            None => {
                self.entries.remove(&member.id);
            }
        }
    }

    pub fn replace_all(&mut self, states: &[MemberVoiceState]) {
        self.entries.clear();
        for s in states {
            self.apply(&s.member, s.state);
        }
    }

    pub fn entry(&self, member: MemberId) -> Option<&RosterEntry> {
        self.entries.get(&member)
    }

    pub fn channel_of(&self, member: MemberId) -> Option<ChannelId> {
        self.entries.get(&member).map(|e| e.channel)
    }

    pub fn members_in(&self, channel: ChannelId) -> impl Iterator<Item = &RosterEntry> {
        self.entries.values().filter(move |e| e.channel == channel)
    }

    /// Members in `channel` other than bots and `self_id`. The bot's own
    /// entry is not always flagged as a bot.
    pub fn humans(&self, channel: ChannelId, self_id: MemberId) -> impl Iterator<Item = &RosterEntry> {
        self.members_in(channel)
            .filter(move |e| !e.member.bot && e.member.id != self_id)
    }

    pub fn humans_in(&self, channel: ChannelId, self_id: MemberId) -> usize {
        self.humans(channel, self_id).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_moves_and_departures() {
        let alice = MemberRef::new(1, "alice");
        let mut bot = MemberRef::new(2, "caramella");
        bot.bot = true;

        let mut roster = Roster::default();
        roster.apply(&alice, VoiceState::in_channel(10));
        roster.apply(&bot, VoiceState::in_channel(10));
        assert_eq!(roster.members_in(ChannelId(10)).count(), 2);
        assert_eq!(roster.humans_in(ChannelId(10), MemberId(2)), 1);

        roster.apply(&alice, VoiceState::in_channel(11).deafened(true));
        assert_eq!(roster.channel_of(MemberId(1)), Some(ChannelId(11)));
        assert!(roster.entry(MemberId(1)).unwrap().self_deaf);
        assert_eq!(roster.humans_in(ChannelId(10), MemberId(2)), 0);

        roster.apply(&alice, VoiceState::default());
        assert_eq!(roster.channel_of(MemberId(1)), None);
    }

    #[test]
    fn own_entry_is_never_a_human() {
        let mut roster = Roster::default();
        // Bridges do not always set the bot flag on our own member.
        roster.apply(&MemberRef::new(99, "caramella"), VoiceState::in_channel(10));
        roster.apply(&MemberRef::new(1, "alice"), VoiceState::in_channel(10));

        assert_eq!(roster.humans_in(ChannelId(10), MemberId(99)), 1);
        roster.apply(&MemberRef::new(1, "alice"), VoiceState::default());
        assert_eq!(roster.humans_in(ChannelId(10), MemberId(99)), 0);
        assert_eq!(roster.members_in(ChannelId(10)).count(), 1);
    }
}
