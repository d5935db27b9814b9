//! Clip playback with weighted blending.
//!
//! Every clip of a model gets one action. Actions carry their own playhead,
//! playback rate and influence weight; a cross-fade ramps one weight down
//! while another ramps up so the pose never snaps.

use crate::data_structures::model::ClipInfo;

/// Index of a clip inside one mixer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipHandle(usize);

#[derive(Clone, Copy, Debug, PartialEq)]
struct Fade {
    from: f32,
    to: f32,
    elapsed: f32,
    duration: f32,
}

#[derive(Clone, Debug)]
struct Action {
    clip: ClipInfo,
    time: f32,
    time_scale: f32,
    weight: f32,
    playing: bool,
    fade: Option<Fade>,
}

#[derive(Clone, Debug, Default)]
pub struct AnimationMixer {
    actions: Vec<Action>,
}

impl AnimationMixer {
    pub fn new(clips: &[ClipInfo]) -> Self {
        Self {
            actions: clips
                .iter()
                .cloned()
                .map(|clip| Action {
                    clip,
                    time: 0.0,
                    time_scale: 1.0,
                    weight: 0.0,
                    playing: false,
                    fade: None,
                })
                .collect(),
        }
    }

    /// Looks up a clip whose name contains `needle`, ignoring case.
    pub fn find(&self, needle: &str) -> Option<ClipHandle> {
        let needle = needle.to_lowercase();
        self.actions
            .iter()
            .position(|a| a.clip.name.to_lowercase().contains(&needle))
            .map(ClipHandle)
    }

    /// Idle and walk clips. Models that don't name them are assumed to list
    /// idle first and walk second.
    pub fn idle_and_walk(&self) -> (Option<ClipHandle>, Option<ClipHandle>) {
        let idle = self
            .find("idle")
            .or_else(|| (!self.actions.is_empty()).then_some(ClipHandle(0)));
        let walk = self
            .find("walk")
            .or_else(|| (self.actions.len() > 1).then_some(ClipHandle(1)));
        (idle, walk)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Plays `clip` at full weight from the start and silences the rest.
    pub fn play(&mut self, clip: ClipHandle) {
        for (index, action) in self.actions.iter_mut().enumerate() {
            action.fade = None;
            if index == clip.0 {
                action.playing = true;
                action.time = 0.0;
                action.weight = 1.0;
            } else {
                action.playing = false;
                action.weight = 0.0;
            }
        }
    }

    /// Blends from whatever is playing to `to` over `duration` seconds.
    pub fn cross_fade_to(&mut self, to: ClipHandle, duration: f32) {
        if to.0 >= self.actions.len() {
            return;
        }
        let duration = duration.max(f32::EPSILON);
        for (index, action) in self.actions.iter_mut().enumerate() {
            let target = if index == to.0 { 1.0 } else { 0.0 };
            if index == to.0 && !action.playing {
                action.time = 0.0;
            }
            if index == to.0 {
                action.playing = true;
            }
            if action.playing {
                action.fade = Some(Fade {
                    from: action.weight,
                    to: target,
                    elapsed: 0.0,
                    duration,
                });
            }
        }
    }

    pub fn set_time_scale(&mut self, clip: ClipHandle, time_scale: f32) {
        if let Some(action) = self.actions.get_mut(clip.0) {
            action.time_scale = time_scale;
        }
    }

    pub fn update(&mut self, dt: f32) {
        for action in self.actions.iter_mut().filter(|a| a.playing) {
            if action.clip.duration > 0.0 {
                action.time = (action.time + dt * action.time_scale).rem_euclid(action.clip.duration);
            }
            if let Some(fade) = action.fade.as_mut() {
                fade.elapsed += dt;
                let t = (fade.elapsed / fade.duration).min(1.0);
                action.weight = fade.from + (fade.to - fade.from) * t;
                if t >= 1.0 {
                    action.weight = fade.to;
                    action.fade = None;
                    if action.weight <= 0.0 {
                        action.playing = false;
                    }
                }
            }
        }
    }

    pub fn weight(&self, clip: ClipHandle) -> f32 {
        self.actions.get(clip.0).map_or(0.0, |a| a.weight)
    }

    pub fn time(&self, clip: ClipHandle) -> f32 {
        self.actions.get(clip.0).map_or(0.0, |a| a.time)
    }

    pub fn time_scale(&self, clip: ClipHandle) -> f32 {
        self.actions.get(clip.0).map_or(0.0, |a| a.time_scale)
    }

    pub fn is_playing(&self, clip: ClipHandle) -> bool {
        self.actions.get(clip.0).is_some_and(|a| a.playing)
    }

    pub fn stop_all(&mut self) {
        for action in &mut self.actions {
            action.playing = false;
            action.weight = 0.0;
            action.fade = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clips() -> Vec<ClipInfo> {
        vec![
            ClipInfo { name: "Idle".into(), duration: 2.0 },
            ClipInfo { name: "Walking".into(), duration: 1.0 },
        ]
    }

    #[test]
    fn cross_fade_ends_with_only_target_weighted() {
        let mut mixer = AnimationMixer::new(&clips());
        let (idle, walk) = mixer.idle_and_walk();
        let (idle, walk) = (idle.unwrap(), walk.unwrap());
        mixer.play(idle);
        mixer.cross_fade_to(walk, 0.35);

        mixer.update(0.175);
        assert!((mixer.weight(walk) - 0.5).abs() < 1e-4);
        assert!((mixer.weight(idle) - 0.5).abs() < 1e-4);

        mixer.update(0.2);
        assert_eq!(mixer.weight(walk), 1.0);
        assert_eq!(mixer.weight(idle), 0.0);
        assert!(!mixer.is_playing(idle));
    }

    #[test]
    fn playback_rate_scales_and_wraps() {
        let mut mixer = AnimationMixer::new(&clips());
        let walk = mixer.find("walk").unwrap();
        mixer.play(walk);
        mixer.set_time_scale(walk, 1.5);
        mixer.update(0.5);
        assert!((mixer.time(walk) - 0.75).abs() < 1e-5);
        mixer.update(0.5);
        assert!((mixer.time(walk) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn unnamed_clips_fall_back_to_order() {
        let mixer = AnimationMixer::new(&[
            ClipInfo { name: "A".into(), duration: 1.0 },
            ClipInfo { name: "B".into(), duration: 1.0 },
        ]);
        assert_eq!(mixer.idle_and_walk(), (Some(ClipHandle(0)), Some(ClipHandle(1))));
        assert_eq!(AnimationMixer::new(&[]).idle_and_walk(), (None, None));
    }
}
