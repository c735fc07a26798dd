use std::cmp::Reverse;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::api::ApiClient;
use crate::error::BoardError;
use crate::models::Ack;
use crate::models::shop::Rank;
use crate::models::task::{Task, TaskDraft};

/// Where an xp total sits on the rank ladder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankStanding {
    pub current: Option<Rank>,
    pub next: Option<Rank>,
}

impl RankStanding {
    /// `current` is the highest rank whose threshold `xp` has reached, `next`
    /// the lowest one above it. `ranks` may come in any order.
    pub fn from_xp(ranks: &[Rank], xp: u32) -> Self {
        let mut ladder: Vec<&Rank> = ranks.iter().collect();
        ladder.sort_by_key(|rank| rank.required_xp);

        let reached = ladder.partition_point(|rank| rank.required_xp <= xp);
        Self {
            current: reached.checked_sub(1).map(|i| ladder[i].clone()),
            next: ladder.get(reached).map(|rank| (*rank).clone()),
        }
    }

    /// Fraction of the way from the current threshold to the next, in
    /// `0.0..=1.0`. At the top of the ladder this is 1.0.
    pub fn progress(&self, xp: u32) -> f64 {
        let Some(next) = &self.next else {
            return 1.0;
        };
        let floor = self.current.as_ref().map_or(0, |rank| rank.required_xp);
        let span = next.required_xp.saturating_sub(floor);
        if span == 0 {
            return 1.0;
        }
        (f64::from(xp.saturating_sub(floor)) / f64::from(span)).clamp(0.0, 1.0)
    }

    fn current_id(&self) -> Option<i64> {
        self.current.as_ref().map(|rank| rank.id)
    }
}

/// The current rank moved, up or down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankChange {
    pub from: Option<Rank>,
    pub to: Option<Rank>,
}

impl RankChange {
    pub fn is_promotion(&self) -> bool {
        let from = self.from.as_ref().map_or(0, |rank| rank.required_xp);
        let to = self.to.as_ref().map_or(0, |rank| rank.required_xp);
        to > from
    }
}

/// xp and gold taken for deleting an unfinished task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Penalty {
    pub xp: u32,
    pub gold: u32,
}

impl Penalty {
    pub fn is_zero(&self) -> bool {
        self.xp == 0 && self.gold == 0
    }
}

/// Deleting a finished task is free; deleting an unfinished one costs twice
/// its reward.
pub fn deletion_penalty(task: &Task) -> Penalty {
    if task.is_completed {
        return Penalty::default();
    }
    Penalty {
        xp: task.reward_xp.saturating_mul(2),
        gold: task.reward_gold.saturating_mul(2),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToggleOutcome {
    pub task_id: i64,
    pub is_completed: bool,
    pub xp: u32,
    pub gold: u32,
    pub rank_change: Option<RankChange>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOutcome {
    pub task_id: i64,
    pub penalty: Penalty,
    pub xp: u32,
    pub gold: u32,
    pub rank_change: Option<RankChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    /// Hardest first.
    Difficulty,
    Title,
}

/// Local view of the task screen: tasks, the character's balance and rank.
///
/// Every mutation goes to the server first. Local state only changes after
/// the call succeeded; on any error (including cancellation) it is left as
/// it was.
pub struct TaskBoard {
    api: ApiClient,
    tasks: Vec<Task>,
    xp: u32,
    gold: u32,
    ranks: Vec<Rank>,
    standing: RankStanding,
}

impl TaskBoard {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            tasks: Vec::new(),
            xp: 0,
            gold: 0,
            ranks: Vec::new(),
            standing: RankStanding::default(),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn xp(&self) -> u32 {
        self.xp
    }

    pub fn gold(&self) -> u32 {
        self.gold
    }

    pub fn ranks(&self) -> &[Rank] {
        &self.ranks
    }

    pub fn standing(&self) -> &RankStanding {
        &self.standing
    }

    /* ---------- PUBLIC API ---------- */

    /// Fetches tasks, character and rank ladder together and replaces the
    /// board's state with them.
    #[instrument(skip_all)]
    pub async fn load(&mut self, cancel: &CancellationToken) -> Result<(), BoardError> {
        let (tasks, character, ranks) = tokio::try_join!(
            self.api.list_tasks(cancel),
            self.api.get_character(cancel),
            self.api.list_ranks(cancel),
        )?;

        self.tasks = tasks;
        self.xp = character.xp;
        self.gold = character.gold;
        self.standing = RankStanding::from_xp(&ranks, self.xp);
        self.ranks = ranks;
        info!(tasks = self.tasks.len(), xp = self.xp, gold = self.gold, "Task board loaded");
        Ok(())
    }

    /// Completes an open task or reopens a finished one, crediting or
    /// debiting its reward. A balance echoed by the server wins over the
    /// local arithmetic.
    #[instrument(skip(self, cancel))]
    pub async fn toggle_completion(
        &mut self,
        task_id: i64,
        cancel: &CancellationToken,
    ) -> Result<ToggleOutcome, BoardError> {
        let index = self.index_of(task_id)?;
        let task = &self.tasks[index];
        let completing = !task.is_completed;
        let (reward_xp, reward_gold) = (task.reward_xp, task.reward_gold);

        let response = if completing {
            self.api.complete_task(task_id, cancel).await?
        } else {
            self.api.uncomplete_task(task_id, cancel).await?
        };

        let (xp, gold) = match response.user {
            Some(user) => (user.xp, user.gold),
            None if completing => (
                self.xp.saturating_add(reward_xp),
                self.gold.saturating_add(reward_gold),
            ),
            None => (
                self.xp.saturating_sub(reward_xp),
                self.gold.saturating_sub(reward_gold),
            ),
        };
        self.tasks[index].is_completed = completing;
        let rank_change = self.apply_balance(xp, gold);
        info!(completed = completing, xp = self.xp, gold = self.gold, "Task toggled");

        Ok(ToggleOutcome {
            task_id,
            is_completed: completing,
            xp: self.xp,
            gold: self.gold,
            rank_change,
        })
    }

    /// Deletes a task, charging `deletion_penalty` when it was unfinished
    /// unless the server reports the resulting balance itself.
    #[instrument(skip(self, cancel))]
    pub async fn delete(&mut self, task_id: i64, cancel: &CancellationToken) -> Result<DeleteOutcome, BoardError> {
        let index = self.index_of(task_id)?;
        let penalty = deletion_penalty(&self.tasks[index]);

        let response = self.api.delete_task(task_id, cancel).await?;

        self.tasks.remove(index);
        let (xp, gold) = match response.user {
            Some(user) => (user.xp, user.gold),
            None => (
                self.xp.saturating_sub(penalty.xp),
                self.gold.saturating_sub(penalty.gold),
            ),
        };
        let rank_change = self.apply_balance(xp, gold);
        info!(penalty_xp = penalty.xp, penalty_gold = penalty.gold, "Task deleted");

        Ok(DeleteOutcome {
            task_id,
            penalty,
            xp: self.xp,
            gold: self.gold,
            rank_change,
        })
    }

    /// Creates the task when `draft.id` is empty, updates it otherwise. The
    /// server's copy replaces the local one.
    #[instrument(skip_all, fields(task_id = ?draft.id))]
    pub async fn save(&mut self, draft: &TaskDraft, cancel: &CancellationToken) -> Result<&Task, BoardError> {
        let index = match draft.id {
            Some(id) => {
                let index = self.index_of(id)?;
                let task = self.api.update_task(id, draft, cancel).await?;
                self.tasks[index] = task;
                index
            }
            None => {
                let task = self.api.create_task(draft, cancel).await?;
                self.tasks.push(task);
                self.tasks.len() - 1
            }
        };
        Ok(&self.tasks[index])
    }

    /// Checks that every collaborator is a friend, then invites them to the
    /// task.
    #[instrument(skip(self, cancel))]
    pub async fn invite(
        &self,
        task_id: i64,
        collaborator_ids: &[i64],
        cancel: &CancellationToken,
    ) -> Result<Ack, BoardError> {
        self.index_of(task_id)?;
        if collaborator_ids.is_empty() {
            return Ok(Ack::default());
        }
        self.api
            .check_collaboration(Some(task_id), collaborator_ids, cancel)
            .await?;
        Ok(self.api.send_invitations(task_id, collaborator_ids, cancel).await?)
    }

    /// Answers an invitation to someone else's task. Accepting reloads the
    /// task list, where the shared task now shows up.
    #[instrument(skip(self, cancel))]
    pub async fn respond(
        &mut self,
        invitation_id: i64,
        accept: bool,
        cancel: &CancellationToken,
    ) -> Result<Ack, BoardError> {
        let ack = self.api.respond_invitation(invitation_id, accept, cancel).await?;
        if accept {
            self.tasks = self.api.list_tasks(cancel).await?;
        }
        Ok(ack)
    }

    pub fn sorted(&self, order: SortOrder) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().collect();
        match order {
            SortOrder::Newest => tasks.sort_by_key(|task| Reverse((task.created_at, task.id))),
            SortOrder::Oldest => tasks.sort_by_key(|task| (task.created_at, task.id)),
            SortOrder::Difficulty => tasks.sort_by_key(|task| (Reverse(task.difficulty), task.id)),
            SortOrder::Title => tasks.sort_by_cached_key(|task| (task.title.to_lowercase(), task.id)),
        }
        tasks
    }

    /* ---------- PRIVATE HELPERS ---------- */

    fn index_of(&self, task_id: i64) -> Result<usize, BoardError> {
        self.tasks
            .iter()
            .position(|task| task.id == task_id)
            .ok_or(BoardError::UnknownTask(task_id))
    }

    fn apply_balance(&mut self, xp: u32, gold: u32) -> Option<RankChange> {
        self.xp = xp;
        self.gold = gold;

        let standing = RankStanding::from_xp(&self.ranks, xp);
        let change = (standing.current_id() != self.standing.current_id()).then(|| RankChange {
            from: self.standing.current.clone(),
            to: standing.current.clone(),
        });
        if let Some(change) = &change {
            info!(
                from = ?change.from.as_ref().map(|rank| &rank.name),
                to = ?change.to.as_ref().map(|rank| &rank.name),
                "Rank changed"
            );
        }
        self.standing = standing;
        change
    }
}
