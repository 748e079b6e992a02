use std::path::Path;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::lock::FileLock;
use crate::io::store::JsonFileStore;
use crate::model::config::Config;
use crate::model::entity::{Entity, TaskItem, TaskList, TaskStatus};
use crate::ops::check;
use crate::ops::compare::TreeComparator;
use crate::ops::sync::SyncSession;
use crate::ops::task_tree::TaskTree;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Settings shared by every command
struct Context {
    store: String,
    config: Config,
    json: bool,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let config = config_io::read_config(Path::new(&cli.config))?;
    let ctx = Context {
        store: cli.store,
        config,
        json: cli.json,
    };

    match cli.command {
        // Read commands
        Commands::Show(args) => cmd_show(&ctx, args),
        Commands::Check => cmd_check(&ctx),
        Commands::Diff(args) => cmd_diff(&ctx, args),

        // Write commands
        Commands::Add(args) => cmd_add(&ctx, args),
        Commands::Title(args) => mutate(&ctx, |tree| {
            let mut entity = tree.get_entity_for_id(&args.id)?.clone();
            match &mut entity {
                Entity::List(list) => list.title = args.title.clone(),
                Entity::Item(item) => item.title = args.title.clone(),
            }
            tree.update_entity(entity)?;
            Ok(vec![args.id.clone()])
        }),
        Commands::Rm(args) => mutate(&ctx, |tree| {
            for id in &args.ids {
                tree.remove_entity(id)?;
            }
            Ok(args.ids.clone())
        }),
        Commands::Promote(args) => mutate(&ctx, |tree| {
            tree.promote_task(&args.ids)?;
            Ok(args.ids.clone())
        }),
        Commands::Demote(args) => mutate(&ctx, |tree| {
            tree.demote_task(&args.ids)?;
            Ok(args.ids.clone())
        }),
        Commands::Up(args) => mutate(&ctx, |tree| {
            tree.reorder_task_up(&args.ids)?;
            Ok(args.ids.clone())
        }),
        Commands::Down(args) => mutate(&ctx, |tree| {
            tree.reorder_task_down(&args.ids)?;
            Ok(args.ids.clone())
        }),
        Commands::Done(args) => set_status(&ctx, &args.ids, TaskStatus::Completed),
        Commands::Reopen(args) => set_status(&ctx, &args.ids, TaskStatus::NeedsAction),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_tree(path: &str) -> Result<TaskTree, Box<dyn std::error::Error>> {
    let store = JsonFileStore::open(Path::new(path))?;
    Ok(TaskTree::from_entities(store.entities())?)
}

/// Fetch the store, apply `op` to the working tree, push the diff back and
/// save, all under the store lock. `op` returns the IDs it acted on.
fn mutate<F>(ctx: &Context, op: F) -> CmdResult
where
    F: FnOnce(&mut TaskTree) -> Result<Vec<String>, Box<dyn std::error::Error>>,
{
    let path = Path::new(&ctx.store);
    let _lock = FileLock::acquire_default(path)?;
    let mut store = JsonFileStore::open(path)?;
    let mut session = SyncSession::fetch(&mut store, ctx.config.sync.clone())?;

    let changed = op(session.working_mut())?;
    let report = session.push(&mut store)?;
    store.save()?;

    if ctx.json {
        let out = MutationJson {
            changed: &changed,
            sync: &report,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for id in &changed {
            println!("{}", id);
        }
        eprintln!("{}", render_report(&report));
    }
    Ok(())
}

fn set_status(ctx: &Context, ids: &[String], status: TaskStatus) -> CmdResult {
    mutate(ctx, |tree| {
        let mut changed = Vec::new();
        for id in ids {
            for touched in tree.update_task_status(id, status)? {
                if !changed.contains(&touched) {
                    changed.push(touched);
                }
            }
        }
        Ok(changed)
    })
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_show(ctx: &Context, args: ShowArgs) -> CmdResult {
    let tree = load_tree(&ctx.store)?;
    if ctx.json {
        let json = tree_to_json(&tree, args.id.as_deref())?;
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        let text = render_tree(&tree, args.id.as_deref(), &ctx.config.display)?;
        if !text.is_empty() {
            println!("{}", text);
        }
    }
    Ok(())
}

fn cmd_check(ctx: &Context) -> CmdResult {
    let tree = load_tree(&ctx.store)?;
    let result = check::check_tree(&tree);

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", render_check(&result));
    }

    check_status(&result)
}

/// Returned by `tt check` when the tree has errors, so `main` exits non-zero
/// after the report is printed.
#[derive(Debug, thiserror::Error)]
#[error("check found {0} error(s)")]
struct CheckFailed(usize);

fn check_status(result: &check::CheckResult) -> CmdResult {
    if result.valid {
        Ok(())
    } else {
        Err(CheckFailed(result.errors.len()).into())
    }
}

fn cmd_diff(ctx: &Context, args: DiffArgs) -> CmdResult {
    let baseline = load_tree(&args.baseline)?;
    let working = load_tree(&args.working)?;
    let diff = TreeComparator::new(&baseline, &working).diff();

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&diff)?);
    } else {
        println!("{}", render_diff(&diff));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(ctx: &Context, args: AddArgs) -> CmdResult {
    mutate(ctx, |tree| {
        let entity: Entity = match (&args.list, &args.parent) {
            (None, None) => {
                if args.position.is_some() {
                    return Err("--position only applies to items".into());
                }
                TaskList::new(args.title.clone()).into()
            }
            (list, Some(parent_id)) => {
                let parent = tree
                    .get_entity_for_id(parent_id)?
                    .as_item()
                    .ok_or_else(|| format!("parent is not an item: {}", parent_id))?;
                if let Some(list) = list
                    && *list != parent.list_id
                {
                    return Err(format!("{} is not in list {}", parent_id, list).into());
                }
                let mut item = TaskItem::new(parent.list_id.clone(), args.title.clone())
                    .under(parent_id.clone());
                item.position = args.position;
                item.into()
            }
            (Some(list), None) => {
                let mut item = TaskItem::new(list.clone(), args.title.clone());
                item.position = args.position;
                item.into()
            }
        };
        let id = entity.id().to_string();
        tree.add_entity(entity)?;
        Ok(vec![id])
    })
}
