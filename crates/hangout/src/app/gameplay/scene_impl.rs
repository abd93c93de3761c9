impl Scene for HangoutScene {
    fn load(&mut self, world: &mut SceneWorld) {
        world.spawn_character(Character::new(PLAYER_SPAWN, AnimationSet::player()));
        if matches!(self.map, MapState::NotRequested) {
            self.request_map();
        }
        info!(presence = self.presence.label(), "hangout_scene_loaded");
    }

    fn update(&mut self, dt_ms: f32, input: &InputSnapshot, world: &mut SceneWorld) {
        self.poll_map(world);
        self.poll_presence();
        world.advance(dt_ms, input);
    }

    fn unload(&mut self, world: &mut SceneWorld) {
        world.clear();
        self.presence_feed = None;
        info!(remote_players = self.remote_player_count(), "hangout_scene_unloaded");
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        self.players_online()
            .map(|online| format!("{WINDOW_TITLE} - {online} online"))
    }

    fn status_lines(&self, world: &SceneWorld) -> Vec<String> {
        let mut lines = Vec::with_capacity(4);
        lines.push(match self.players_online() {
            Some(online) => format!("PLAYERS: {online} ({} REMOTE)", self.remote_player_count()),
            None => format!("PRESENCE: {}", self.presence.label()),
        });
        if let Some(character) = world.character() {
            lines.push(format!(
                "POS: {:.0}, {:.0}  {}",
                character.position.x,
                character.position.y,
                character.facing().as_str()
            ));
        }
        let camera = world.camera().position;
        lines.push(format!("CAM: {:.1}, {:.1}", camera.x, camera.y));
        lines.push(format!("MAP: {}", self.map.label()));
        lines
    }
}
