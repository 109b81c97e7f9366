use std::sync::{Mutex, PoisonError};
use tracing::Level;

use cadence_scripting_host::{Script, ScriptControl, ScriptDescriptor, Tier};

static DESCRIPTOR: ScriptDescriptor =
    ScriptDescriptor::new("vip-patrol", Tier::Restricted, &["cadence"]);

/// Host module holding the route walked by [`VipPatrolScript`]
#[derive(Debug, Default)]
pub struct Waypoints {
    points: Mutex<Vec<(i32, i32)>>,
}

impl Waypoints {
    pub fn new(points: Vec<(i32, i32)>) -> Self {
        Self {
            points: Mutex::new(points),
        }
    }

    pub fn points(&self) -> Vec<(i32, i32)> {
        self.points.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn push(&self, point: (i32, i32)) {
        self.points.lock().unwrap_or_else(PoisonError::into_inner).push(point);
    }
}

/// Walks the [`Waypoints`] route in a loop
#[derive(Default)]
pub struct VipPatrolScript {
    route: Vec<(i32, i32)>,
    next: usize,
}

impl VipPatrolScript {
    const STEP_MS: i64 = 600;
}

impl Script for VipPatrolScript {
    fn descriptor(&self) -> Option<&'static ScriptDescriptor> {
        Some(&DESCRIPTOR)
    }

    fn init(&mut self, script: &ScriptControl) -> bool {
        let Some(waypoints) = script.module::<Waypoints>() else {
            script.log_at(Level::WARN, "No Waypoints module available");
            return false;
        };

        self.route = waypoints.points();
        if self.route.is_empty() {
            script.log_at(Level::WARN, "Route has no waypoints");
            return false;
        }

        script.log(&format!("Patrolling {} waypoints", self.route.len()));
        true
    }

    fn pulse(&mut self, script: &ScriptControl) -> i64 {
        let (x, y) = self.route[self.next];
        script.log_at(Level::DEBUG, &format!("walking to ({}, {})", x, y));
        self.next = (self.next + 1) % self.route.len();
        Self::STEP_MS
    }

    fn close(&mut self, _script: &ScriptControl) {}
}
