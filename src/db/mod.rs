mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;

use crate::error::{Error, Result};
use crate::models::*;
use crate::schedule;

/// All persistent state, behind a single SQLite connection.
///
/// Every query that touches an entity is scoped to a project (or, for
/// tasks, to the owning login); nothing leaks across projects.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent).context("Failed to create data directory")?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "rsk")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("rsk.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn).map_err(Error::from)
    }

    // ============================================================
    // Project operations
    // ============================================================

    pub fn create_project(&self, login: &str, title: &str) -> Result<Project> {
        non_empty("Project title", title)?;
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        conn.execute(
            "INSERT INTO projects (login, title, created_at) VALUES (?1, ?2, ?3)",
            (login, title, now.to_rfc3339()),
        )?;
        Ok(Project {
            id: conn.last_insert_rowid(),
            login: login.to_string(),
            title: title.to_string(),
            created_at: now,
        })
    }

    pub fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt =
            conn.prepare("SELECT id, login, title, created_at FROM projects WHERE id = ?1")?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Project {
                id: row.get(0)?,
                login: row.get(1)?,
                title: row.get(2)?,
                created_at: parse_datetime(row.get::<_, String>(3)?),
            }))
        } else {
            Ok(None)
        }
    }

    pub fn get_projects(&self, login: &str) -> Result<Vec<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, login, title, created_at FROM projects WHERE login = ?1 ORDER BY title",
        )?;
        let projects = stmt
            .query_map([login], |row| {
                Ok(Project {
                    id: row.get(0)?,
                    login: row.get(1)?,
                    title: row.get(2)?,
                    created_at: parse_datetime(row.get::<_, String>(3)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    // ============================================================
    // Cause operations
    // ============================================================

    pub fn add_cause(&self, project: i64, text: &str) -> Result<Cause> {
        non_empty("Cause", text)?;
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        conn.execute(
            "INSERT INTO causes (project, text, created_at) VALUES (?1, ?2, ?3)",
            (project, text, now.to_rfc3339()),
        )?;
        Ok(Cause {
            id: conn.last_insert_rowid(),
            project,
            text: text.to_string(),
            emoji: None,
            created_at: now,
        })
    }

    pub fn get_cause(&self, project: i64, id: i64) -> Result<Option<Cause>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project, text, emoji, created_at
             FROM causes WHERE project = ?1 AND id = ?2",
        )?;
        let mut rows = stmt.query([project, id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Cause {
                id: row.get(0)?,
                project: row.get(1)?,
                text: row.get(2)?,
                emoji: row.get(3)?,
                created_at: parse_datetime(row.get::<_, String>(4)?),
            }))
        } else {
            Ok(None)
        }
    }

    pub fn cause_exists(&self, project: i64, id: i64) -> Result<bool> {
        self.exists("causes", project, id)
    }

    pub fn set_cause_text(&self, project: i64, id: i64, text: &str) -> Result<bool> {
        self.set_text("Cause", "causes", project, id, text)
    }

    /// Sets the one-character marker on a cause. More than one character
    /// is a user error.
    pub fn set_cause_emoji(&self, project: i64, id: i64, emoji: &str) -> Result<bool> {
        if emoji.chars().count() > 1 {
            return Err(Error::user("The emoji must be one symbol only"));
        }
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE causes SET emoji = ?1 WHERE project = ?2 AND id = ?3",
            (emoji, project, id),
        )?;
        Ok(rows > 0)
    }

    pub fn fetch_causes(
        &self,
        project: i64,
        query: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<CauseItem>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, text, emoji FROM causes
             WHERE project = ?1 AND text LIKE ?2
             ORDER BY id LIMIT ?3 OFFSET ?4",
        )?;
        let items = stmt
            .query_map(
                (project, like(query), limit, offset),
                |row| {
                    let id: i64 = row.get(0)?;
                    let text: String = row.get(1)?;
                    Ok(CauseItem {
                        label: format!("C{}: {}", id, text),
                        value: text,
                        fields: CauseFields {
                            cid: id,
                            emoji: row.get(2)?,
                        },
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    // ============================================================
    // Risk operations
    // ============================================================

    pub fn add_risk(&self, project: i64, text: &str) -> Result<Risk> {
        non_empty("Risk", text)?;
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        conn.execute(
            "INSERT INTO risks (project, text, created_at) VALUES (?1, ?2, ?3)",
            (project, text, now.to_rfc3339()),
        )?;
        Ok(Risk {
            id: conn.last_insert_rowid(),
            project,
            text: text.to_string(),
            probability: 0,
            positive: false,
            created_at: now,
        })
    }

    pub fn get_risk(&self, project: i64, id: i64) -> Result<Option<Risk>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project, text, probability, positive, created_at
             FROM risks WHERE project = ?1 AND id = ?2",
        )?;
        let mut rows = stmt.query([project, id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Risk {
                id: row.get(0)?,
                project: row.get(1)?,
                text: row.get(2)?,
                probability: row.get(3)?,
                positive: row.get::<_, i64>(4)? != 0,
                created_at: parse_datetime(row.get::<_, String>(5)?),
            }))
        } else {
            Ok(None)
        }
    }

    pub fn risk_exists(&self, project: i64, id: i64) -> Result<bool> {
        self.exists("risks", project, id)
    }

    pub fn set_risk_text(&self, project: i64, id: i64, text: &str) -> Result<bool> {
        self.set_text("Risk", "risks", project, id, text)
    }

    pub fn set_probability(&self, project: i64, id: i64, probability: i64) -> Result<bool> {
        if !(0..=100).contains(&probability) {
            return Err(Error::user("Probability must be between 0 and 100"));
        }
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE risks SET probability = ?1 WHERE project = ?2 AND id = ?3",
            (probability, project, id),
        )?;
        Ok(rows > 0)
    }

    pub fn set_positive(&self, project: i64, id: i64, positive: bool) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE risks SET positive = ?1 WHERE project = ?2 AND id = ?3",
            (positive as i64, project, id),
        )?;
        Ok(rows > 0)
    }

    /// Risk autocomplete, most severe first. Risks not yet linked to any
    /// effect rank as zero instead of dropping out.
    pub fn fetch_risks(
        &self,
        project: i64,
        query: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RiskItem>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT risks.id, risks.text, risks.probability, risks.positive
             FROM risks
             LEFT JOIN triples ON triples.risk = risks.id
             LEFT JOIN effects ON effects.id = triples.effect
             WHERE risks.project = ?1 AND risks.text LIKE ?2
             GROUP BY risks.id
             ORDER BY risks.probability * COALESCE(SUM(effects.impact), 0) DESC
             LIMIT ?3 OFFSET ?4",
        )?;
        let items = stmt
            .query_map((project, like(query), limit, offset), |row| {
                let id: i64 = row.get(0)?;
                let text: String = row.get(1)?;
                Ok(RiskItem {
                    label: format!("R{}: {}", id, text),
                    value: text,
                    fields: RiskFields {
                        rid: id,
                        probability: row.get(2)?,
                        positive: row.get::<_, i64>(3)? != 0,
                    },
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    // ============================================================
    // Effect operations
    // ============================================================

    pub fn add_effect(&self, project: i64, text: &str) -> Result<Effect> {
        non_empty("Effect", text)?;
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        conn.execute(
            "INSERT INTO effects (project, text, created_at) VALUES (?1, ?2, ?3)",
            (project, text, now.to_rfc3339()),
        )?;
        Ok(Effect {
            id: conn.last_insert_rowid(),
            project,
            text: text.to_string(),
            impact: 0,
            created_at: now,
        })
    }

    pub fn get_effect(&self, project: i64, id: i64) -> Result<Option<Effect>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project, text, impact, created_at
             FROM effects WHERE project = ?1 AND id = ?2",
        )?;
        let mut rows = stmt.query([project, id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Effect {
                id: row.get(0)?,
                project: row.get(1)?,
                text: row.get(2)?,
                impact: row.get(3)?,
                created_at: parse_datetime(row.get::<_, String>(4)?),
            }))
        } else {
            Ok(None)
        }
    }

    pub fn effect_exists(&self, project: i64, id: i64) -> Result<bool> {
        self.exists("effects", project, id)
    }

    pub fn set_effect_text(&self, project: i64, id: i64, text: &str) -> Result<bool> {
        self.set_text("Effect", "effects", project, id, text)
    }

    pub fn set_impact(&self, project: i64, id: i64, impact: i64) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE effects SET impact = ?1 WHERE project = ?2 AND id = ?3",
            (impact, project, id),
        )?;
        Ok(rows > 0)
    }

    pub fn fetch_effects(
        &self,
        project: i64,
        query: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<EffectItem>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, text, impact FROM effects
             WHERE project = ?1 AND text LIKE ?2
             ORDER BY impact DESC LIMIT ?3 OFFSET ?4",
        )?;
        let items = stmt
            .query_map((project, like(query), limit, offset), |row| {
                let id: i64 = row.get(0)?;
                let text: String = row.get(1)?;
                Ok(EffectItem {
                    label: format!("E{}: {}", id, text),
                    value: text,
                    fields: EffectFields {
                        eid: id,
                        impact: row.get(2)?,
                    },
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    // ============================================================
    // Plan operations
    // ============================================================

    pub fn add_plan(&self, project: i64, text: &str) -> Result<Plan> {
        non_empty("Plan", text)?;
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        conn.execute(
            "INSERT INTO plans (project, text, created_at) VALUES (?1, ?2, ?3)",
            (project, text, now.to_rfc3339()),
        )?;
        Ok(Plan {
            id: conn.last_insert_rowid(),
            project,
            text: text.to_string(),
            schedule: None,
            promoted: None,
            created_at: now,
        })
    }

    pub fn get_plan(&self, project: i64, id: i64) -> Result<Option<Plan>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project, text, schedule, promoted, created_at
             FROM plans WHERE project = ?1 AND id = ?2",
        )?;
        let mut rows = stmt.query([project, id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Plan {
                id: row.get(0)?,
                project: row.get(1)?,
                text: row.get(2)?,
                schedule: row.get(3)?,
                promoted: row.get::<_, Option<String>>(4)?.map(parse_datetime),
                created_at: parse_datetime(row.get::<_, String>(5)?),
            }))
        } else {
            Ok(None)
        }
    }

    pub fn plan_exists(&self, project: i64, id: i64) -> Result<bool> {
        self.exists("plans", project, id)
    }

    pub fn set_plan_text(&self, project: i64, id: i64, text: &str) -> Result<bool> {
        self.set_text("Plan", "plans", project, id, text)
    }

    pub fn set_schedule(&self, project: i64, id: i64, schedule: Option<&str>) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE plans SET schedule = ?1 WHERE project = ?2 AND id = ?3",
            (schedule, project, id),
        )?;
        Ok(rows > 0)
    }

    /// Attaches a plan to every triple containing the given part, so the
    /// plan covers the whole chain around that part. The chunk must name a
    /// cause, risk or effect (`C…`/`R…`/`E…`).
    pub fn attach_plan(&self, project: i64, plan: i64, chunk: &str) -> Result<usize> {
        let Some((kind, id)) = parse_chunk(chunk) else {
            return Err(Error::user(format!("Not a valid chunk: {:?}", chunk)));
        };
        let column = match kind {
            'C' => "cause",
            'R' => "risk",
            'E' => "effect",
            _ => return Err(Error::user("A plan can only attach to a cause, risk or effect")),
        };
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            &format!(
                "INSERT OR IGNORE INTO plan_triples (plan, triple)
                 SELECT ?1, id FROM triples WHERE project = ?2 AND {} = ?3",
                column
            ),
            (plan, project, id),
        )?;
        Ok(rows)
    }

    pub fn fetch_plans(
        &self,
        project: i64,
        query: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PlanItem>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, text, schedule FROM plans
             WHERE project = ?1 AND text LIKE ?2
             ORDER BY id LIMIT ?3 OFFSET ?4",
        )?;
        let items = stmt
            .query_map((project, like(query), limit, offset), |row| {
                let id: i64 = row.get(0)?;
                let text: String = row.get(1)?;
                Ok(PlanItem {
                    label: format!("P{}: {}", id, text),
                    value: text,
                    fields: PlanFields {
                        pid: id,
                        schedule: row.get(2)?,
                    },
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    // ============================================================
    // Link & triple operations
    // ============================================================

    pub fn add_link(&self, project: i64, a: &str, b: &str) -> Result<Link> {
        if parse_chunk(a).is_none() || parse_chunk(b).is_none() {
            return Err(Error::user(format!("Not a valid link: {:?} -> {:?}", a, b)));
        }
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO links (project, a, b) VALUES (?1, ?2, ?3)",
            (project, a, b),
        )?;
        Ok(Link {
            id: conn.last_insert_rowid(),
            project,
            a: a.to_string(),
            b: b.to_string(),
        })
    }

    /// Materializes a cause-risk-effect triple. All three parts must already
    /// exist in the project. An identical existing triple is reused.
    pub fn add_triple(&self, project: i64, cause: i64, risk: i64, effect: i64) -> Result<Triple> {
        if !self.cause_exists(project, cause)? {
            return Err(Error::user(format!("No cause C{} in this project", cause)));
        }
        if !self.risk_exists(project, risk)? {
            return Err(Error::user(format!("No risk R{} in this project", risk)));
        }
        if !self.effect_exists(project, effect)? {
            return Err(Error::user(format!("No effect E{} in this project", effect)));
        }
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT OR IGNORE INTO triples (project, cause, risk, effect) VALUES (?1, ?2, ?3, ?4)",
            (project, cause, risk, effect),
        )?;
        let id = conn.query_row(
            "SELECT id FROM triples WHERE cause = ?1 AND risk = ?2 AND effect = ?3",
            (cause, risk, effect),
            |row| row.get(0),
        )?;
        Ok(Triple {
            id,
            project,
            cause,
            risk,
            effect,
        })
    }

    // ============================================================
    // Ranking query
    // ============================================================

    /// Risks joined through triples to effects, ordered by
    /// `rank = probability × sum(impact)` descending.
    pub fn ranked(
        &self,
        project: i64,
        query: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RankedRisk>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT risks.id, risks.text, risks.probability, risks.positive,
                    SUM(effects.impact) AS impact,
                    risks.probability * SUM(effects.impact) AS rank
             FROM risks
             JOIN triples ON triples.risk = risks.id
             JOIN effects ON effects.id = triples.effect
             WHERE risks.project = ?1 AND risks.text LIKE ?2
             GROUP BY risks.id
             ORDER BY rank DESC
             LIMIT ?3 OFFSET ?4",
        )?;
        let ranked = stmt
            .query_map((project, like(query), limit, offset), |row| {
                Ok(RankedRisk {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    probability: row.get(2)?,
                    positive: row.get::<_, i64>(3)? != 0,
                    impact: row.get(4)?,
                    rank: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ranked)
    }

    // ============================================================
    // Task operations
    // ============================================================

    /// Promotes every due plan of the login into a task. A plan is due when
    /// its schedule, anchored at the last promotion (or creation), has come
    /// around and no open task exists for it. One-shot date schedules do not
    /// come due again after the task is done. Returns how many tasks were
    /// created.
    pub fn promote_plans(&self, login: &str) -> Result<usize> {
        let now = Utc::now();
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT plans.id, plans.schedule, plans.promoted, plans.created_at
             FROM plans
             JOIN projects ON projects.id = plans.project
             WHERE projects.login = ?1
               AND NOT EXISTS (SELECT 1 FROM tasks WHERE tasks.plan = plans.id)",
        )?;
        let candidates = stmt
            .query_map([login], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(stmt);

        let mut created = 0;
        for (plan, sched, promoted, created_at) in candidates {
            let promoted = promoted.map(parse_datetime);
            let anchor = promoted.unwrap_or_else(|| parse_datetime(created_at));
            let due = schedule::next(sched.as_deref(), anchor);
            if due > now {
                continue;
            }
            // An absolute-date schedule already promoted once stays quiet.
            if promoted.is_some() && due <= anchor {
                continue;
            }
            let deadline = schedule::deadline(sched.as_deref(), now);
            conn.execute(
                "INSERT INTO tasks (plan, deadline, created_at) VALUES (?1, ?2, ?3)",
                (plan, deadline.to_rfc3339(), now.to_rfc3339()),
            )?;
            tracing::debug!("Promoted plan P{} into a task due {}", plan, deadline);
            created += 1;
        }
        Ok(created)
    }

    /// Open tasks across all the login's projects. The text search spans
    /// the whole chain: cause, risk, effect and plan texts reachable
    /// through the plan's triples.
    pub fn fetch_tasks(
        &self,
        login: &str,
        query: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT DISTINCT tasks.id, tasks.plan, plans.text, tasks.deadline, tasks.created_at
             FROM tasks
             JOIN plans ON plans.id = tasks.plan
             JOIN projects ON projects.id = plans.project
             LEFT JOIN plan_triples ON plan_triples.plan = plans.id
             LEFT JOIN triples ON triples.id = plan_triples.triple
             LEFT JOIN causes ON causes.id = triples.cause
             LEFT JOIN risks ON risks.id = triples.risk
             LEFT JOIN effects ON effects.id = triples.effect
             WHERE projects.login = ?1
               AND (plans.text LIKE ?2 OR causes.text LIKE ?2
                    OR risks.text LIKE ?2 OR effects.text LIKE ?2)
             ORDER BY tasks.deadline
             LIMIT ?3 OFFSET ?4",
        )?;
        let tasks = stmt
            .query_map((login, like(query), limit, offset), |row| {
                Ok(Task {
                    id: row.get(0)?,
                    plan: row.get(1)?,
                    text: row.get(2)?,
                    deadline: parse_datetime(row.get::<_, String>(3)?),
                    created_at: parse_datetime(row.get::<_, String>(4)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    pub fn count_tasks(&self, login: &str) -> Result<i64> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let count = conn.query_row(
            "SELECT COUNT(*) FROM tasks
             JOIN plans ON plans.id = tasks.plan
             JOIN projects ON projects.id = plans.project
             WHERE projects.login = ?1",
            [login],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn get_task(&self, login: &str, id: i64) -> Result<Option<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT tasks.id, tasks.plan, plans.text, tasks.deadline, tasks.created_at
             FROM tasks
             JOIN plans ON plans.id = tasks.plan
             JOIN projects ON projects.id = plans.project
             WHERE projects.login = ?1 AND tasks.id = ?2",
        )?;
        let mut rows = stmt.query((login, id))?;
        if let Some(row) = rows.next()? {
            Ok(Some(Task {
                id: row.get(0)?,
                plan: row.get(1)?,
                text: row.get(2)?,
                deadline: parse_datetime(row.get::<_, String>(3)?),
                created_at: parse_datetime(row.get::<_, String>(4)?),
            }))
        } else {
            Ok(None)
        }
    }

    /// Pushes the task's deadline forward by the given number of seconds.
    pub fn postpone_task(&self, login: &str, id: i64, seconds: i64) -> Result<bool> {
        let Some(task) = self.get_task(login, id)? else {
            return Ok(false);
        };
        let deadline = task.deadline + Duration::seconds(seconds);
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE tasks SET deadline = ?1 WHERE id = ?2",
            (deadline.to_rfc3339(), id),
        )?;
        Ok(rows > 0)
    }

    /// Deletes the task and stamps the plan's `promoted` time, so a
    /// recurring plan comes due again one schedule period later.
    pub fn done_task(&self, login: &str, id: i64) -> Result<bool> {
        let Some(task) = self.get_task(login, id)? else {
            return Ok(false);
        };
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        conn.execute(
            "UPDATE plans SET promoted = ?1 WHERE id = ?2",
            (Utc::now().to_rfc3339(), task.plan),
        )?;
        Ok(true)
    }

    // ============================================================
    // Shared helpers
    // ============================================================

    fn exists(&self, table: &'static str, project: i64, id: i64) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE project = ?1 AND id = ?2",
                table
            ),
            [project, id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn set_text(
        &self,
        kind: &'static str,
        table: &'static str,
        project: i64,
        id: i64,
        text: &str,
    ) -> Result<bool> {
        non_empty(kind, text)?;
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            &format!("UPDATE {} SET text = ?1 WHERE project = ?2 AND id = ?3", table),
            (text, project, id),
        )?;
        Ok(rows > 0)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_the_data_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rsk.db");
        let db = Database::open(path.clone()).unwrap();
        db.migrate().unwrap();
        assert!(path.exists());
        // Reopening an already-migrated file is a no-op
        let db = Database::open(path).unwrap();
        db.migrate().unwrap();
    }

    #[test]
    fn malformed_stored_timestamp_falls_back_to_now() {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        let project = db.create_project("jeff23", "test").unwrap();
        {
            let conn = db.conn.lock().unwrap();
            conn.execute(
                "UPDATE projects SET created_at = 'not a timestamp' WHERE id = ?1",
                [project.id],
            )
            .unwrap();
        }

        let before = Utc::now();
        let found = db.get_project(project.id).unwrap().expect("project");
        assert!(found.created_at >= before);
        assert!(found.created_at <= Utc::now());
    }
}

fn non_empty(kind: &str, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::user(format!("{} text can't be empty", kind)));
    }
    Ok(())
}

fn like(query: &str) -> String {
    format!("%{}%", query)
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(&s) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(e) => {
            tracing::warn!("Malformed timestamp {:?} in database: {}", s, e);
            Utc::now()
        }
    }
}
