use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    commands::{Command, CommandInvocation, LEADERBOARD_SIZE, Reply, ScoreLine, TargetArg},
    common::{
        errors::CaramellaError,
        readable,
        types::{ChannelId, GuildId, MemberId, MemberRef, Shared},
    },
    configs::BotConfig,
    ledger::ScoreLedger,
    listening::ListeningRegistry,
    playback::{AudioAsset, PlaybackSession, Target, validate_tempo},
    voice::{
        driver::VoiceDriver,
        events::{GatewayEvent, MemberVoiceState, VoiceStateChange},
        roster::Roster,
    },
};

/// One step the controller asks the voice driver to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Capture the position, then leave voice.
    Disconnect,
    Connect(ChannelId),
    /// Rebuild the source from the frozen position and start it.
    Play,
    /// Capture the position, then stop the current source.
    Stop,
}

const MAX_PENDING_ECHOES: usize = 4;

/// Everything the controller knows about one guild.
#[derive(Debug)]
pub struct GuildState {
    pub guild_id: GuildId,
    /// The bot's own member id in this guild.
    pub self_id: MemberId,
    pub roster: Roster,
    pub session: Option<PlaybackSession>,
    /// The bot's voice channel, set only after the driver confirmed a connect.
    pub connected: Option<ChannelId>,
    /// Voice updates for the bot that our own connects and disconnects will
    /// still produce, oldest first.
    echoes: VecDeque<Option<ChannelId>>,
}

impl GuildState {
    pub fn new(guild_id: GuildId, self_id: MemberId) -> Self {
        Self {
            guild_id,
            self_id,
            roster: Roster::default(),
            session: None,
            connected: None,
            echoes: VecDeque::new(),
        }
    }

    pub fn target(&self) -> Target {
        self.session
            .as_ref()
            .map(PlaybackSession::target)
            .unwrap_or_default()
    }

    fn humans_in(&self, channel: ChannelId) -> usize {
        self.roster.humans_in(channel, self.self_id)
    }

    fn expect_echo(&mut self, channel: Option<ChannelId>) {
        if self.echoes.len() == MAX_PENDING_ECHOES {
            self.echoes.pop_front();
        }
        self.echoes.push_back(channel);
    }

    /// Consumes `channel` if it is an echo of one of our own actions.
    fn take_echo(&mut self, channel: Option<ChannelId>) -> bool {
        match self.echoes.iter().position(|c| *c == channel) {
            Some(pos) => {
                self.echoes.drain(..=pos);
                true
            }
            None => false,
        }
    }
}

/// Leave actions needed before the bot can join `channel`, followed by the join itself.
fn move_to(connected: Option<ChannelId>, channel: ChannelId) -> Vec<Action> {
    if connected == Some(channel) {
        return Vec::new();
    }
    let mut actions = Vec::with_capacity(3);
    if connected.is_some() {
        actions.push(Action::Disconnect);
    }
    actions.push(Action::Connect(channel));
    actions.push(Action::Play);
    actions
}

/// Decides how the bot follows its target after `change` has been applied to the roster.
/// Leave actions always come before join actions.
pub fn plan_follow(state: &GuildState, change: &VoiceStateChange) -> Vec<Action> {
    let connected = state.connected;
    let before = change.before.channel_id;
    let after = change.after.channel_id;

    match state.target() {
        Target::Member(target) if target == change.member.id => {
            let mut actions = Vec::new();
            let mut current = connected;
            if current.is_some() && after != current {
                actions.push(Action::Disconnect);
                current = None;
            }
            if let Some(channel) = after {
                actions.extend(move_to(current, channel));
            }
            actions
        }
        Target::Channel(channel) => {
            if before == Some(channel)
                && after != before
                && connected == Some(channel)
                && state.humans_in(channel) == 0
            {
                vec![Action::Disconnect]
            } else if after == Some(channel)
                && after != before
                && state.humans_in(channel) > 0
            {
                move_to(connected, channel)
            } else {
                Vec::new()
            }
        }
        _ => Vec::new(),
    }
}

/// Decides what a freshly set target requires right now. The bot stays
/// where it is until the new target is somewhere it can follow.
pub fn plan_retarget(state: &GuildState, target: Target) -> Vec<Action> {
    let connected = state.connected;
    match target {
        Target::Member(member) => match state.roster.entry(member) {
            Some(entry) if !entry.member.bot && entry.member.id != state.self_id => move_to(connected, entry.channel),
            _ => Vec::new(),
        },
        // An empty channel is joined once someone enters it.
        Target::Channel(channel) if state.humans_in(channel) > 0 => {
            move_to(connected, channel)
        }
        Target::Channel(_) | Target::None => Vec::new(),
    }
}

/// The member stopped hearing the bot: they deafened, or left the bot's channel.
fn left_or_deafened(bot_channel: Option<ChannelId>, change: &VoiceStateChange) -> bool {
    let deafened = !change.before.self_deaf && change.after.self_deaf;
    let left = bot_channel.is_some()
        && change.before.channel_id == bot_channel
        && change.moved_channel();
    deafened || left
}

/// The member started hearing the bot: they entered its channel undeafened,
/// or undeafened inside it.
fn joined_or_undeafened(bot_channel: Option<ChannelId>, change: &VoiceStateChange) -> bool {
    let (before, after) = (change.before, change.after);
    bot_channel.is_some()
        && after.channel_id == bot_channel
        && !after.self_deaf
        && (change.moved_channel() || before.self_deaf)
}

/// The voice-follow state machine.
///
/// Events for one guild are processed to completion under that guild's lock,
/// so a leave is always finished before the next join starts.
pub struct Controller {
    self_id: MemberId,
    operators: HashSet<MemberId>,
    prefixes: Vec<String>,
    asset: AudioAsset,
    registry: Arc<ListeningRegistry>,
    ledger: Arc<ScoreLedger>,
    driver: Arc<dyn VoiceDriver>,
    guilds: DashMap<GuildId, Shared<GuildState>>,
}

impl Controller {
    pub fn new(
        bot: &BotConfig,
        registry: Arc<ListeningRegistry>,
        ledger: Arc<ScoreLedger>,
        driver: Arc<dyn VoiceDriver>,
    ) -> Self {
        Self {
            self_id: bot.user_id,
            operators: bot.operators.iter().copied().collect(),
            prefixes: bot.prefixes.clone(),
            asset: AudioAsset::from_config(bot),
            registry,
            ledger,
            driver,
            guilds: DashMap::new(),
        }
    }

    fn guild(&self, guild_id: GuildId) -> Shared<GuildState> {
        self.guilds
            .entry(guild_id)
            .or_insert_with(|| Arc::new(Mutex::new(GuildState::new(guild_id, self.self_id))))
            .clone()
    }

    fn known_guilds(&self) -> Vec<Shared<GuildState>> {
        self.guilds.iter().map(|g| g.value().clone()).collect()
    }

    pub async fn connected_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let guild = self.guilds.get(&guild_id).map(|g| g.value().clone())?;
        let state = guild.lock().await;
        state.connected
    }

    pub async fn target(&self, guild_id: GuildId) -> Target {
        match self.guilds.get(&guild_id).map(|g| g.value().clone()) {
            Some(guild) => guild.lock().await.target(),
            None => Target::None,
        }
    }

    pub async fn tempo(&self, guild_id: GuildId) -> Option<f64> {
        let guild = self.guilds.get(&guild_id).map(|g| g.value().clone())?;
        let state = guild.lock().await;
        state.session.as_ref().map(PlaybackSession::tempo)
    }

    /// Humans sharing a channel with the bot, over all guilds.
    pub async fn listener_count(&self) -> usize {
        let mut total = 0;
        for guild in self.known_guilds() {
            let state = guild.lock().await;
            if let Some(channel) = state.connected {
                total += state.humans_in(channel);
            }
        }
        total
    }

    /// Handles one gateway event. A returned reply goes back to the invoking channel.
    pub async fn handle(&self, event: GatewayEvent) -> Result<Option<Reply>, CaramellaError> {
        match event {
            GatewayEvent::VoiceStateChanged(change) => {
                self.on_voice_state(change).await.map(|_| None)
            }
            GatewayEvent::CommandInvoked(invocation) => self.on_command(invocation).await,
            GatewayEvent::VoiceSnapshot { guild_id, states } => {
                self.on_snapshot(guild_id, &states).await;
                Ok(None)
            }
        }
    }

    // -- Voice state ------------------------------------------------------

    async fn on_voice_state(&self, change: VoiceStateChange) -> Result<(), CaramellaError> {
        let guild = self.guild(change.guild_id);
        let mut state = guild.lock().await;
        state.roster.apply(&change.member, change.after);

        if change.member.id == self.self_id {
            self.reconcile_self(&mut state, change.after.channel_id).await;
            return Ok(());
        }
        if change.member.bot {
            return Ok(());
        }

        // Stops are judged against the channel the bot was in when the event
        // arrived, starts against wherever it ended up.
        let was_in = state.connected;
        if left_or_deafened(was_in, &change) {
            self.stop_listening(change.member.id).await;
        }

        let actions = plan_follow(&state, &change);
        if !actions.is_empty() {
            debug!("[{}] {} moved, follow plan {:?}", state.guild_id, change.member.name, actions);
        }
        let outcome = self.execute(&mut state, &actions).await;

        if joined_or_undeafened(state.connected, &change) {
            self.start_listening(&change.member);
        }
        outcome
    }

    async fn on_snapshot(&self, guild_id: GuildId, states: &[MemberVoiceState]) {
        let guild = self.guild(guild_id);
        let mut state = guild.lock().await;
        state.roster.replace_all(states);
        info!("[{}] Voice roster seeded with {} members", guild_id, states.len());

        state.echoes.clear();
        let bot_channel = state.roster.channel_of(self.self_id);
        if bot_channel != state.connected {
            self.reconcile_self(&mut state, bot_channel).await;
        } else if let Some(channel) = state.connected {
            self.start_channel(&state, channel);
        }
    }

    /// A voice update for the bot itself. Echoes of our own actions are
    /// dropped; anything else means a moderator moved or kicked the bot.
    async fn reconcile_self(&self, state: &mut GuildState, channel: Option<ChannelId>) {
        if state.take_echo(channel) || state.connected == channel {
            return;
        }
        info!(
            "[{}] Bot voice channel changed externally: {:?} -> {:?}",
            state.guild_id, state.connected, channel
        );
        if channel.is_none() {
            if let Some(session) = state.session.as_mut() {
                session.freeze();
                session.release();
            }
        }
        let old = std::mem::replace(&mut state.connected, channel);
        self.bot_moved(state, old, channel).await;
    }

    // -- Action execution -------------------------------------------------

    async fn execute(&self, state: &mut GuildState, actions: &[Action]) -> Result<(), CaramellaError> {
        let guild_id = state.guild_id;
        for action in actions {
            match *action {
                Action::Disconnect => self.leave(state).await,
                Action::Stop => {
                    if let Some(session) = state.session.as_mut() {
                        session.freeze();
                        session.release();
                    }
                    if let Err(e) = self.driver.stop(guild_id).await {
                        warn!("[{}] {}", guild_id, e);
                    }
                }
                Action::Connect(channel) => {
                    info!("[{}] Joining {}...", guild_id, channel);
                    if let Err(e) = self.driver.connect(guild_id, channel).await {
                        warn!("[{}] {}; will retry on the next voice event", guild_id, e);
                        return Err(e);
                    }
                    let old = state.connected.replace(channel);
                    state.expect_echo(Some(channel));
                    self.bot_moved(state, old, Some(channel)).await;
                }
                Action::Play => {
                    let source = state
                        .session
                        .get_or_insert_with(|| PlaybackSession::new(Target::None))
                        .reload(&self.asset)
                        .clone();
                    if let Err(e) = self.driver.play(guild_id, &source).await {
                        // Not connected until audio plays; the next event reconnects.
                        warn!("[{}] {}; leaving until the next voice event", guild_id, e);
                        if let Some(session) = state.session.as_mut() {
                            session.release();
                        }
                        self.leave(state).await;
                        return Err(e);
                    }
                    if let Some(session) = state.session.as_mut() {
                        session.mark_playing();
                    }
                    debug!("[{}] Playing from {}s ({})", guild_id, source.seek, source.filter);
                }
            }
        }
        Ok(())
    }

    /// Captures the position and leaves voice. A failed disconnect is logged
    /// and the guild is treated as disconnected anyway.
    async fn leave(&self, state: &mut GuildState) {
        let Some(channel) = state.connected else {
            return;
        };
        info!("[{}] Leaving {}...", state.guild_id, channel);
        if let Some(session) = state.session.as_mut() {
            session.freeze();
            session.release();
        }
        if let Err(e) = self.driver.disconnect(state.guild_id).await {
            warn!("[{}] {}", state.guild_id, e);
        }
        state.connected = None;
        state.expect_echo(None);
        self.bot_moved(state, Some(channel), None).await;
    }

    // -- Listening timers -------------------------------------------------

    async fn bot_moved(&self, state: &GuildState, old: Option<ChannelId>, new: Option<ChannelId>) {
        if let Some(old) = old {
            let leaving: Vec<MemberId> = state
                .roster
                .humans(old, self.self_id)
                .map(|e| e.member.id)
                .collect();
            for member in leaving {
                self.stop_listening(member).await;
            }
        }
        if let Some(new) = new {
            self.start_channel(state, new);
        }
    }

    fn start_channel(&self, state: &GuildState, channel: ChannelId) {
        for entry in state.roster.humans(channel, self.self_id) {
            if !entry.self_deaf {
                self.start_listening(&entry.member);
            }
        }
    }

    fn start_listening(&self, member: &MemberRef) {
        if self.registry.start(member) {
            info!("{} started listening!", member.name);
            self.ledger.publish_listening(member.id, true);
        }
    }

    async fn stop_listening(&self, member: MemberId) {
        if let Some(elapsed) = self.registry.stop_and_credit(member, &self.ledger).await {
            info!("{} stopped listening after {}s", member, elapsed.as_secs());
            self.ledger.publish_listening(member, false);
        }
    }

    // -- Commands ---------------------------------------------------------

    async fn on_command(&self, invocation: CommandInvocation) -> Result<Option<Reply>, CaramellaError> {
        let command = match Command::parse(&invocation.content, &self.prefixes) {
            None => return Ok(None),
            Some(parsed) => parsed?,
        };
        debug!(
            "[{}] {} ran {:?}",
            invocation.guild_id, invocation.invoker.name, command
        );
        let invoker = &invocation.invoker;

        let reply = match command {
            Command::Leaderboard => self.leaderboard().await?,
            Command::Stats(member) => self.stats(invoker, member).await?,
            Command::Target(arg) => {
                if !self.operators.contains(&invoker.id) {
                    return Err(CaramellaError::Forbidden);
                }
                let guild = self.guild(invocation.guild_id);
                let mut state = guild.lock().await;
                self.retarget(&mut state, arg).await?
            }
            Command::Join => {
                let guild = self.guild(invocation.guild_id);
                let mut state = guild.lock().await;
                self.join(&mut state, invoker).await?
            }
            Command::Speed(tempo) => {
                let tempo = validate_tempo(tempo)?;
                let guild = self.guild(invocation.guild_id);
                let mut state = guild.lock().await;
                self.speed(&mut state, invoker, tempo).await?
            }
        };
        Ok(Some(reply))
    }

    async fn retarget(&self, state: &mut GuildState, arg: TargetArg) -> Result<Reply, CaramellaError> {
        let target = match arg {
            TargetArg::Member(member) => Target::Member(member),
            TargetArg::Channel(channel) => Target::Channel(channel),
            TargetArg::Id(id) if state.roster.entry(MemberId(id)).is_some() => {
                Target::Member(MemberId(id))
            }
            TargetArg::Id(id) => Target::Channel(ChannelId(id)),
        };

        match state.session.as_mut() {
            Some(session) => session.retarget(target),
            None => state.session = Some(PlaybackSession::new(target)),
        }
        info!("[{}] Now targeting {:?}", state.guild_id, target);

        let actions = plan_retarget(state, target);
        self.execute(state, &actions).await?;

        Ok(Reply::message(match target {
            Target::Member(member) => format!("Now following <@{}>", member),
            Target::Channel(channel) => format!("Now following <#{}>", channel),
            Target::None => "Not following anyone".to_string(),
        }))
    }

    async fn join(&self, state: &mut GuildState, invoker: &MemberRef) -> Result<Reply, CaramellaError> {
        let channel = state
            .roster
            .channel_of(invoker.id)
            .ok_or(CaramellaError::NotConnected)?;
        if state.connected == Some(channel) {
            return Ok(Reply::message("Already dancing in here!"));
        }

        self.execute(state, &[Action::Disconnect]).await?;
        state.session = Some(PlaybackSession::new(Target::Channel(channel)));
        self.execute(state, &[Action::Connect(channel), Action::Play])
            .await?;
        Ok(Reply::message(format!("Dancing in <#{}>", channel)))
    }

    async fn speed(
        &self,
        state: &mut GuildState,
        invoker: &MemberRef,
        tempo: f64,
    ) -> Result<Reply, CaramellaError> {
        match state.connected {
            None => {
                let channel = state
                    .roster
                    .channel_of(invoker.id)
                    .ok_or(CaramellaError::NotConnected)?;
                state
                    .session
                    .get_or_insert_with(|| PlaybackSession::new(Target::Channel(channel)))
                    .set_tempo(tempo)?;
                self.execute(state, &[Action::Connect(channel), Action::Play])
                    .await?;
            }
            Some(_) => {
                if self.driver.is_playing(state.guild_id).await {
                    self.execute(state, &[Action::Stop]).await?;
                }
                let session = state
                    .session
                    .get_or_insert_with(|| PlaybackSession::new(Target::None));
                // Freeze with the old tempo before the new one applies.
                session.freeze();
                session.set_tempo(tempo)?;
                self.execute(state, &[Action::Play]).await?;
            }
        }
        Ok(Reply::message(format!("Speed set to {}x", tempo)))
    }

    async fn leaderboard(&self) -> Result<Reply, CaramellaError> {
        self.registry.flush_all(&self.ledger).await;

        let mut entries = Vec::new();
        for entry in self.ledger.top_n(LEADERBOARD_SIZE).await? {
            let name = self
                .ledger
                .display_name(entry.member)
                .await?
                .unwrap_or_else(|| entry.member.to_string());
            entries.push(ScoreLine {
                name,
                value: readable(entry.score),
            });
        }
        Ok(Reply::Leaderboard { entries })
    }

    async fn stats(&self, invoker: &MemberRef, member: Option<MemberId>) -> Result<Reply, CaramellaError> {
        let member = member.unwrap_or(invoker.id);
        self.registry.flush_member(member, &self.ledger).await;

        let score = self.ledger.get_score(member).await?;
        let name = if member == invoker.id {
            invoker.name.clone()
        } else {
            self.ledger
                .display_name(member)
                .await?
                .unwrap_or_else(|| member.to_string())
        };
        Ok(Reply::Stats {
            entry: ScoreLine {
                name,
                value: readable(score),
            },
        })
    }
}
