//! Voice channel occupancy, read from the guild cache.

use serenity::model::{
    guild::Guild,
    id::{ChannelId, UserId},
};

/// One entry of a guild's voice states.
#[derive(Debug, Clone, Copy)]
pub struct Occupant {
    pub channel_id: Option<ChannelId>,
    pub is_bot: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    /// The bot is not in a voice channel of this guild.
    NotConnected,
    /// The bot's channel has no human listeners.
    Vacant(ChannelId),
    Listeners(ChannelId, usize),
}

/// Counts non-bot occupants of `channel_id`.
pub fn listeners_in(channel_id: ChannelId, occupants: impl IntoIterator<Item = Occupant>) -> usize {
    occupants
        .into_iter()
        .filter(|occupant| occupant.channel_id == Some(channel_id) && !occupant.is_bot)
        .count()
}

pub fn occupancy(guild: &Guild, bot_id: UserId) -> Occupancy {
    let Some(channel_id) = guild
        .voice_states
        .get(&bot_id)
        .and_then(|state| state.channel_id)
    else {
        return Occupancy::NotConnected;
    };

    let occupants = guild.voice_states.iter().map(|(user_id, state)| Occupant {
        channel_id: state.channel_id,
        is_bot: state
            .member
            .as_ref()
            .map(|member| member.user.bot)
            .or_else(|| guild.members.get(user_id).map(|member| member.user.bot))
            .unwrap_or(false),
    });

    match listeners_in(channel_id, occupants) {
        0 => Occupancy::Vacant(channel_id),
        count => Occupancy::Listeners(channel_id, count),
    }
}

/// Voice channel the user is currently in.
pub fn user_channel(guild: &Guild, user_id: UserId) -> Option<ChannelId> {
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}
