// Shared fixtures for the integration suites

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use workout_tracker::models::{Plan, PlanDay, PlanExercise};
use workout_tracker::{ApiError, ProgressStore, SessionConfig, WorkoutSessionTracker};

pub const PLAN_ID: &str = "42";
pub const CLIENT_ID: &str = "7";

/// Two days, three sets of ten on day 0
pub fn two_day_plan(rest: u32) -> Plan {
    Plan::new(vec![
        PlanDay::new(vec![PlanExercise::new("Back squat", 3, 10, Some(rest))]),
        PlanDay::new(vec![
            PlanExercise::new("Bench press", 3, 8, Some(90)),
            PlanExercise::new("Barbell row", 3, 10, Some(90)),
        ]),
    ])
}

pub fn tracker_with(store: Arc<dyn ProgressStore>, plan: Plan) -> WorkoutSessionTracker {
    let tracker = WorkoutSessionTracker::new(store, SessionConfig::default());
    tracker.set_plan(plan);
    tracker
}

/// In-memory progress endpoint
#[derive(Default)]
pub struct MemoryStore {
    plans: Mutex<HashMap<(String, String), Plan>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_plan(plan: Plan) -> Arc<Self> {
        let store = Self::default();
        store.insert(PLAN_ID, CLIENT_ID, plan);
        Arc::new(store)
    }

    pub fn insert(&self, plan_id: &str, client_id: &str, plan: Plan) {
        self.plans
            .lock()
            .unwrap()
            .insert((plan_id.to_string(), client_id.to_string()), plan);
    }

    pub fn stored(&self) -> Option<Plan> {
        self.plans
            .lock()
            .unwrap()
            .get(&(PLAN_ID.to_string(), CLIENT_ID.to_string()))
            .cloned()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn fetch_plan(&self, plan_id: &str, client_id: &str) -> Result<Option<Plan>, ApiError> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .get(&(plan_id.to_string(), client_id.to_string()))
            .cloned())
    }

    async fn store_plan(&self, plan_id: &str, client_id: &str, plan: &Plan) -> Result<(), ApiError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ApiError::ServerError("database unavailable".to_string()));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.insert(plan_id, client_id, plan.clone());
        Ok(())
    }
}

/// Store whose responses arrive after scripted delays
#[derive(Default)]
pub struct SlowStore {
    loads: Mutex<VecDeque<(Duration, Option<Plan>)>>,
    save_delay: Duration,
    saved: Mutex<Vec<Plan>>,
}

impl SlowStore {
    pub fn with_loads(loads: Vec<(Duration, Option<Plan>)>) -> Arc<Self> {
        Arc::new(Self {
            loads: Mutex::new(loads.into()),
            ..Default::default()
        })
    }

    pub fn with_save_delay(save_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            save_delay,
            ..Default::default()
        })
    }

    pub fn saved(&self) -> Vec<Plan> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressStore for SlowStore {
    async fn fetch_plan(&self, _plan_id: &str, _client_id: &str) -> Result<Option<Plan>, ApiError> {
        let next = self.loads.lock().unwrap().pop_front();
        let Some((delay, plan)) = next else {
            return Ok(None);
        };
        tokio::time::sleep(delay).await;
        Ok(plan)
    }

    async fn store_plan(&self, _plan_id: &str, _client_id: &str, plan: &Plan) -> Result<(), ApiError> {
        tokio::time::sleep(self.save_delay).await;
        self.saved.lock().unwrap().push(plan.clone());
        Ok(())
    }
}
