//! Challenge checks over the quest list and the daily claim board.

use crate::config::{ChallengeConfig, RewardConfig};
use crate::models::Quest;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// True if any quest was completed on `today`.
pub fn completed_today(quests: &[Quest], today: NaiveDate) -> bool {
    quests.iter().any(|q| q.completion_day() == Some(today))
}

/// True if completions cover `days` consecutive calendar days.
pub fn consecutive_days(quests: &[Quest], days: u32) -> bool {
    let completed: BTreeSet<NaiveDate> = quests.iter().filter_map(Quest::completion_day).collect();
    longest_run(&completed) >= days.max(1) as usize
}

/// True if at least `target` quests are completed.
pub fn total_completed(quests: &[Quest], target: usize) -> bool {
    quests.iter().filter(|q| q.is_completed()).count() >= target
}

fn longest_run(days: &BTreeSet<NaiveDate>) -> usize {
    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;

    for day in days {
        run = match prev {
            Some(p) if p.succ_opt() == Some(*day) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(*day);
    }
    best
}

/// A challenge that can be claimed once per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengeKind {
    Today,
    Streak,
    Total,
}

impl ChallengeKind {
    pub const ALL: [ChallengeKind; 3] = [Self::Today, Self::Streak, Self::Total];
}

/// Evaluated state of one challenge.
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeStatus {
    pub kind: ChallengeKind,
    pub met: bool,
    pub claimed: bool,
    pub reward: i64,
}

/// Challenge progress and today's claims. Kept in memory only.
#[derive(Debug, Clone)]
pub struct ChallengeBoard {
    thresholds: ChallengeConfig,
    rewards: RewardConfig,
    statuses: Vec<ChallengeStatus>,
    claims: HashMap<ChallengeKind, NaiveDate>,
    prize_claimed: Option<NaiveDate>,
}

impl ChallengeBoard {
    pub fn new(thresholds: ChallengeConfig, rewards: RewardConfig) -> Self {
        Self {
            thresholds,
            rewards,
            statuses: Vec::new(),
            claims: HashMap::new(),
            prize_claimed: None,
        }
    }

    /// Re-evaluate every challenge against the quest list.
    pub fn evaluate(&mut self, quests: &[Quest], today: NaiveDate) {
        self.statuses = ChallengeKind::ALL
            .into_iter()
            .map(|kind| {
                let met = match kind {
                    ChallengeKind::Today => completed_today(quests, today),
                    ChallengeKind::Streak => {
                        consecutive_days(quests, self.thresholds.consecutive_days)
                    }
                    ChallengeKind::Total => total_completed(quests, self.thresholds.total_quests),
                };
                ChallengeStatus {
                    kind,
                    met,
                    claimed: self.claims.get(&kind) == Some(&today),
                    reward: self.reward_for(kind),
                }
            })
            .collect();
    }

    /// Statuses from the last evaluation.
    pub fn statuses(&self) -> &[ChallengeStatus] {
        &self.statuses
    }

    /// Threshold values, for labels.
    pub fn thresholds(&self) -> &ChallengeConfig {
        &self.thresholds
    }

    /// Claim a met, unclaimed challenge. Returns the reward.
    pub fn claim(&mut self, kind: ChallengeKind, quests: &[Quest], today: NaiveDate) -> Option<i64> {
        self.evaluate(quests, today);
        let status = self.statuses.iter_mut().find(|s| s.kind == kind)?;
        if !status.met || status.claimed {
            return None;
        }
        status.claimed = true;
        self.claims.insert(kind, today);
        Some(status.reward)
    }

    /// Whether the daily prize can be taken.
    pub fn prize_available(&self, today: NaiveDate) -> bool {
        self.prize_claimed != Some(today) && self.statuses.iter().any(|s| s.met)
    }

    /// Take the daily prize. Returns the reward.
    pub fn claim_prize(&mut self, quests: &[Quest], today: NaiveDate) -> Option<i64> {
        self.evaluate(quests, today);
        if !self.prize_available(today) {
            return None;
        }
        self.prize_claimed = Some(today);
        Some(self.rewards.prize)
    }

    fn reward_for(&self, kind: ChallengeKind) -> i64 {
        match kind {
            ChallengeKind::Today => self.rewards.today_challenge,
            ChallengeKind::Streak => self.rewards.streak_challenge,
            ChallengeKind::Total => self.rewards.total_challenge,
        }
    }
}
