use serenity::{
    all::ButtonStyle,
    builder::{CreateActionRow, CreateButton},
};

use crate::{
    audio::queue::LoopMode,
    bot::actions::{Action, VOLUME_STEP},
};

/// Custom ids of the player buttons.
pub mod button_ids {
    pub const PLAY_PAUSE: &str = "music_play_pause";
    pub const SKIP: &str = "music_skip";
    pub const STOP: &str = "music_stop";
    pub const LOOP: &str = "music_loop";
    pub const QUEUE: &str = "music_queue";
    pub const VOLUME_UP: &str = "music_volume_up";
    pub const VOLUME_DOWN: &str = "music_volume_down";
}

/// Maps a button's custom id to the action it triggers.
pub fn action_for(custom_id: &str) -> Option<Action> {
    let action = match custom_id {
        button_ids::PLAY_PAUSE => Action::TogglePause,
        button_ids::SKIP => Action::Skip,
        button_ids::STOP => Action::Stop,
        button_ids::LOOP => Action::CycleLoop,
        button_ids::QUEUE => Action::Queue { page: 1 },
        button_ids::VOLUME_UP => Action::AdjustVolume { delta: VOLUME_STEP },
        button_ids::VOLUME_DOWN => Action::AdjustVolume { delta: -VOLUME_STEP },
        _ => return None,
    };
    Some(action)
}

/// Controls attached to now-playing messages.
pub fn player_buttons(paused: bool, loop_mode: LoopMode) -> Vec<CreateActionRow> {
    let play_pause_emoji = if paused { '▶' } else { '⏸' };
    let (loop_emoji, loop_style) = match loop_mode {
        LoopMode::Off => ('🔁', ButtonStyle::Secondary),
        LoopMode::One => ('🔂', ButtonStyle::Success),
        LoopMode::All => ('🔁', ButtonStyle::Success),
    };

    let row1 = CreateActionRow::Buttons(vec![
        CreateButton::new(button_ids::PLAY_PAUSE)
            .emoji(play_pause_emoji)
            .style(ButtonStyle::Primary),
        CreateButton::new(button_ids::SKIP)
            .emoji('⏭')
            .style(ButtonStyle::Secondary),
        CreateButton::new(button_ids::STOP)
            .emoji('⏹')
            .style(ButtonStyle::Danger),
        CreateButton::new(button_ids::LOOP)
            .emoji(loop_emoji)
            .style(loop_style),
    ]);

    let row2 = CreateActionRow::Buttons(vec![
        CreateButton::new(button_ids::VOLUME_DOWN)
            .emoji('🔉')
            .style(ButtonStyle::Secondary),
        CreateButton::new(button_ids::VOLUME_UP)
            .emoji('🔊')
            .style(ButtonStyle::Secondary),
        CreateButton::new(button_ids::QUEUE)
            .label("Queue")
            .emoji('📋')
            .style(ButtonStyle::Secondary),
    ]);

    vec![row1, row2]
}
