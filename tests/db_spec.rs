use chrono::{Duration, Utc};
use rsk::db::Database;
use speculate2::speculate;

fn create_test_project(db: &Database) -> i64 {
    db.create_project("jeff23", "test")
        .expect("Failed to create project")
        .id
}

/// Builds the usual chain: one cause, one risk, one effect, one triple.
fn create_chain(db: &Database, project: i64) -> (i64, i64, i64) {
    let cid = db.add_cause(project, "we have data").expect("cause").id;
    let rid = db.add_risk(project, "we may lose it").expect("risk").id;
    let eid = db.add_effect(project, "business will stop").expect("effect").id;
    db.add_triple(project, cid, rid, eid).expect("triple");
    (cid, rid, eid)
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "projects" {
        it "creates a project and lists it by login" {
            let project = db.create_project("jeff23", "backups").expect("Failed to create");
            assert!(project.id > 0);

            let projects = db.get_projects("jeff23").expect("Query failed");
            assert_eq!(projects.len(), 1);
            assert_eq!(projects[0].title, "backups");

            let others = db.get_projects("somebody-else").expect("Query failed");
            assert!(others.is_empty());
        }

        it "rejects an empty title" {
            let err = db.create_project("jeff23", "  ").unwrap_err();
            assert!(err.is_user());
        }
    }

    describe "causes" {
        it "adds and fetches by search" {
            let project = create_test_project(&db);
            let cause = db.add_cause(project, "we store PII").expect("Failed to add");
            assert!(cause.id > 0);

            let items = db.fetch_causes(project, "PII", 0, 10).expect("Query failed");
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].label, format!("C{}: we store PII", cause.id));
            assert_eq!(items[0].fields.cid, cause.id);
        }

        it "rejects empty text" {
            let project = create_test_project(&db);
            let err = db.add_cause(project, "").unwrap_err();
            assert!(err.is_user());
            assert_eq!(err.to_string(), "Cause text can't be empty");
        }

        it "accepts a one-character emoji and rejects longer ones" {
            let project = create_test_project(&db);
            let cause = db.add_cause(project, "we store PII").expect("Failed to add");

            assert!(db.set_cause_emoji(project, cause.id, "💾").expect("Update failed"));
            let found = db.get_cause(project, cause.id).expect("Query failed").unwrap();
            assert_eq!(found.emoji.as_deref(), Some("💾"));

            let err = db.set_cause_emoji(project, cause.id, "!!").unwrap_err();
            assert!(err.is_user());
        }

        it "scopes queries to the project" {
            let mine = create_test_project(&db);
            let theirs = db.create_project("somebody-else", "test").expect("project").id;
            db.add_cause(mine, "we store PII").expect("Failed to add");

            assert!(db.fetch_causes(theirs, "", 0, 10).expect("Query failed").is_empty());
        }
    }

    describe "risks" {
        it "adds, updates probability and fetches" {
            let project = create_test_project(&db);
            let risk = db.add_risk(project, "we may lose data").expect("Failed to add");
            assert_eq!(risk.probability, 0);
            assert!(!risk.positive);

            assert!(db.set_probability(project, risk.id, 40).expect("Update failed"));
            assert!(db.set_positive(project, risk.id, true).expect("Update failed"));

            let items = db.fetch_risks(project, "lose", 0, 10).expect("Query failed");
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].fields.probability, 40);
            assert!(items[0].fields.positive);
        }

        it "rejects probability outside 0..=100" {
            let project = create_test_project(&db);
            let risk = db.add_risk(project, "we may lose data").expect("Failed to add");
            assert!(db.set_probability(project, risk.id, 101).unwrap_err().is_user());
            assert!(db.set_probability(project, risk.id, -1).unwrap_err().is_user());
        }
    }

    describe "effects" {
        it "adds, updates impact and orders by it" {
            let project = create_test_project(&db);
            let small = db.add_effect(project, "minor delay").expect("Failed to add");
            let big = db.add_effect(project, "major outage").expect("Failed to add");
            db.set_impact(project, small.id, 2).expect("Update failed");
            db.set_impact(project, big.id, 9).expect("Update failed");

            let items = db.fetch_effects(project, "", 0, 10).expect("Query failed");
            assert_eq!(items.len(), 2);
            assert_eq!(items[0].fields.eid, big.id);
            assert_eq!(items[1].fields.eid, small.id);
        }
    }

    describe "triples" {
        it "requires all three parts to exist in the project" {
            let project = create_test_project(&db);
            let cid = db.add_cause(project, "we have data").expect("cause").id;
            let rid = db.add_risk(project, "we may lose it").expect("risk").id;
            let err = db.add_triple(project, cid, rid, 999).unwrap_err();
            assert!(err.is_user());
        }

        it "reuses an identical triple" {
            let project = create_test_project(&db);
            let (cid, rid, eid) = create_chain(&db, project);
            let first = db.add_triple(project, cid, rid, eid).expect("triple");
            let second = db.add_triple(project, cid, rid, eid).expect("triple");
            assert_eq!(first.id, second.id);
            assert_eq!(second.cause, cid);
            assert_eq!(second.risk, rid);
            assert_eq!(second.effect, eid);
        }
    }

    describe "ranked" {
        it "computes rank as probability times summed impact" {
            let project = create_test_project(&db);
            let (cid, rid, eid) = create_chain(&db, project);
            let extra = db.add_effect(project, "reputation damage").expect("effect").id;
            db.add_triple(project, cid, rid, extra).expect("triple");
            db.set_probability(project, rid, 40).expect("probability");
            db.set_impact(project, eid, 3).expect("impact");
            db.set_impact(project, extra, 5).expect("impact");

            let ranked = db.ranked(project, "", 0, 10).expect("Query failed");
            assert_eq!(ranked.len(), 1);
            assert_eq!(ranked[0].impact, 8);
            assert_eq!(ranked[0].rank, 40 * 8);
            assert_eq!(ranked[0].css_class(), "red");
        }

        it "orders by rank descending" {
            let project = create_test_project(&db);
            let cid = db.add_cause(project, "we have data").expect("cause").id;
            let eid = db.add_effect(project, "business will stop").expect("effect").id;
            db.set_impact(project, eid, 10).expect("impact");
            let hot = db.add_risk(project, "hot risk").expect("risk").id;
            let mild = db.add_risk(project, "mild risk").expect("risk").id;
            db.set_probability(project, hot, 90).expect("probability");
            db.set_probability(project, mild, 2).expect("probability");
            db.add_triple(project, cid, hot, eid).expect("triple");
            db.add_triple(project, cid, mild, eid).expect("triple");

            let ranked = db.ranked(project, "", 0, 10).expect("Query failed");
            assert_eq!(ranked.len(), 2);
            assert_eq!(ranked[0].id, hot);
            assert_eq!(ranked[0].css_class(), "red");
            assert_eq!(ranked[1].id, mild);
            assert_eq!(ranked[1].css_class(), "green");
        }
    }

    describe "plans" {
        it "adds and fetches by search" {
            let project = create_test_project(&db);
            let plan = db.add_plan(project, "we make backups").expect("Failed to add");
            assert!(plan.id > 0);

            let items = db.fetch_plans(project, "backups", 0, 10).expect("Query failed");
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].fields.pid, plan.id);
        }

        it "attaches to every triple containing the part" {
            let project = create_test_project(&db);
            let (cid, _rid, eid) = create_chain(&db, project);
            let rid2 = db.add_risk(project, "we may lose it again").expect("risk").id;
            db.add_triple(project, cid, rid2, eid).expect("triple");

            let plan = db.add_plan(project, "solve it!").expect("plan");
            let attached = db.attach_plan(project, plan.id, &format!("E{}", eid))
                .expect("Attach failed");
            assert_eq!(attached, 2);
        }

        it "refuses to attach to another plan" {
            let project = create_test_project(&db);
            let plan = db.add_plan(project, "solve it!").expect("plan");
            assert!(db.attach_plan(project, plan.id, "P1").unwrap_err().is_user());
            assert!(db.attach_plan(project, plan.id, "bogus").unwrap_err().is_user());
        }
    }

    describe "tasks" {
        it "promotes a due plan exactly once and searches the whole chain" {
            let project = create_test_project(&db);
            let (cid, _rid, eid) = create_chain(&db, project);
            let rid2 = db.add_risk(project, "we may lose it again").expect("risk").id;
            db.add_triple(project, cid, rid2, eid).expect("triple");

            let plan = db.add_plan(project, "solve it!").expect("plan");
            db.attach_plan(project, plan.id, &format!("E{}", eid)).expect("attach");
            let past = (Utc::now() - Duration::days(5)).format("%d-%m-%Y").to_string();
            db.set_schedule(project, plan.id, Some(&past)).expect("schedule");

            assert_eq!(db.promote_plans("jeff23").expect("Promote failed"), 1);
            assert_eq!(db.count_tasks("jeff23").expect("Count failed"), 1);

            // One open task per plan, no matter how many triples it covers
            assert_eq!(db.promote_plans("jeff23").expect("Promote failed"), 0);

            for query in ["solve", "business", "data", "again"] {
                let found = db.fetch_tasks("jeff23", query, 0, 10).expect("Query failed");
                assert_eq!(found.len(), 1, "query {:?} should match the task", query);
                assert_eq!(found[0].plan, plan.id);
            }
            assert!(db.fetch_tasks("jeff23", "unrelated", 0, 10).expect("Query failed").is_empty());
        }

        it "does not promote a plan before its schedule comes around" {
            let project = create_test_project(&db);
            let plan = db.add_plan(project, "rotate keys").expect("plan");
            db.set_schedule(project, plan.id, Some("weekly")).expect("schedule");

            assert_eq!(db.promote_plans("jeff23").expect("Promote failed"), 0);
        }

        it "postpones a task's deadline" {
            let project = create_test_project(&db);
            let (_cid, _rid, eid) = create_chain(&db, project);
            let plan = db.add_plan(project, "solve it!").expect("plan");
            db.attach_plan(project, plan.id, &format!("E{}", eid)).expect("attach");
            let past = (Utc::now() - Duration::days(5)).format("%d-%m-%Y").to_string();
            db.set_schedule(project, plan.id, Some(&past)).expect("schedule");
            db.promote_plans("jeff23").expect("Promote failed");

            let task = db.fetch_tasks("jeff23", "", 0, 10).expect("Query failed")
                .into_iter().next().expect("task");
            assert!(db.postpone_task("jeff23", task.id, 3600).expect("Postpone failed"));

            let after = db.get_task("jeff23", task.id).expect("Query failed").expect("task");
            assert_eq!(after.deadline, task.deadline + Duration::seconds(3600));
        }

        it "completing a task retires a one-shot date plan" {
            let project = create_test_project(&db);
            let (_cid, _rid, eid) = create_chain(&db, project);
            let plan = db.add_plan(project, "solve it!").expect("plan");
            db.attach_plan(project, plan.id, &format!("E{}", eid)).expect("attach");
            let past = (Utc::now() - Duration::days(5)).format("%d-%m-%Y").to_string();
            db.set_schedule(project, plan.id, Some(&past)).expect("schedule");
            db.promote_plans("jeff23").expect("Promote failed");

            let task = db.fetch_tasks("jeff23", "", 0, 10).expect("Query failed")
                .into_iter().next().expect("task");
            assert!(db.done_task("jeff23", task.id).expect("Done failed"));
            assert_eq!(db.count_tasks("jeff23").expect("Count failed"), 0);

            // The date came and went; the plan stays quiet now
            assert_eq!(db.promote_plans("jeff23").expect("Promote failed"), 0);

            let stamped = db.get_plan(project, plan.id).expect("Query failed").expect("plan");
            assert!(stamped.promoted.is_some());
        }

        it "ignores other logins' tasks" {
            let project = create_test_project(&db);
            let (_cid, _rid, eid) = create_chain(&db, project);
            let plan = db.add_plan(project, "solve it!").expect("plan");
            db.attach_plan(project, plan.id, &format!("E{}", eid)).expect("attach");
            let past = (Utc::now() - Duration::days(5)).format("%d-%m-%Y").to_string();
            db.set_schedule(project, plan.id, Some(&past)).expect("schedule");
            db.promote_plans("jeff23").expect("Promote failed");

            assert_eq!(db.count_tasks("somebody-else").expect("Count failed"), 0);
            let task = db.fetch_tasks("jeff23", "", 0, 10).expect("Query failed")
                .into_iter().next().expect("task");
            assert!(!db.done_task("somebody-else", task.id).expect("Done failed"));
        }
    }
}
