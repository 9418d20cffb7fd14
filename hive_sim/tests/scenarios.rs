// End-to-end controller scenarios.
//
// Each test builds a small room in the in-memory `Sandbox`, runs whole ticks
// through `run_tick` (or a single `Game` when the test needs to poke at a
// drone directly), and checks what ended up in `Memory` or in the sandbox's
// intent log. Unit-level behaviour is tested next to each module; these
// tests cover the paths that cross modules: role handlers assigning tasks,
// tasks rehydrating across ticks, parent chains unwinding, and population
// control over many ticks.

use hive_sim::memory::CreepMemory;
use hive_sim::object::ObjectKind;
use hive_sim::types::{BodyPart, ObjectId, Position, ResourceType, StructureType, Terrain};
use hive_sim::{Find, Game, HiveConfig, Intent, Memory, Role, Sandbox, Task, TaskKind, TaskRegistry, World, run_tick};

const ROOM: &str = "W1N1";

fn pos(x: i32, y: i32) -> Position {
    Position::new(x, y, ROOM)
}

/// Spawn at (25,25) with `energy`, level-3 controller at (40,40).
fn room(energy: u32) -> Sandbox {
    let mut sandbox = Sandbox::new();
    sandbox.add_room(ROOM);
    sandbox.set_time(1);
    sandbox.add_spawn(pos(25, 25), energy);
    sandbox.add_controller(pos(40, 40), 3, 10_000);
    sandbox
}

/// Add one of our creeps with a memory record and `energy` in its store.
fn enlist(
    sandbox: &mut Sandbox,
    memory: &mut Memory,
    name: &str,
    at: Position,
    body: &[BodyPart],
    role: Role,
    assignment: Option<ObjectId>,
    energy: u32,
) -> ObjectId {
    let id = sandbox.add_creep(name, at, body);
    if let Some(store) = sandbox.store_mut(&id) {
        store.add(ResourceType::Energy, energy);
    }
    memory
        .creeps
        .insert(name.to_string(), CreepMemory::new(ROOM, role, assignment));
    id
}

fn tick(sandbox: &mut Sandbox, memory: &mut Memory) {
    run_tick(sandbox, memory, &HiveConfig::default(), &TaskRegistry::standard());
    sandbox.advance();
}

fn active(memory: &Memory, creep: &str) -> Option<(String, ObjectId)> {
    memory
        .task_of(creep)
        .map(|desc| (desc.name.clone(), desc.target.id.clone()))
}

// ---------------------------------------------------------------------------
// Role handlers
// ---------------------------------------------------------------------------

#[test]
fn empty_miner_harvests_its_source() {
    let mut sandbox = room(300);
    let source = sandbox.add_source(pos(10, 10), 3000);
    let mut memory = Memory::default();
    let miner = [BodyPart::Work, BodyPart::Work, BodyPart::Carry, BodyPart::Move];
    enlist(&mut sandbox, &mut memory, "m1", pos(11, 11), &miner, Role::Miner, Some(source.clone()), 0);

    run_tick(&mut sandbox, &mut memory, &HiveConfig::default(), &TaskRegistry::standard());
    assert_eq!(active(&memory, "m1"), Some(("harvest".into(), source.clone())));
    // Already adjacent, so the task worked on the same tick.
    assert!(sandbox.intents().iter().any(|i| matches!(
        i,
        Intent::Harvest { creep, target, .. } if creep == "m1" && *target == source
    )));
}

#[test]
fn full_hauler_refills_spawn_before_full_tower() {
    let mut sandbox = room(100);
    let spawn = sandbox.find(ROOM, Find::Structures)[0].id.clone();
    let tower = sandbox.add_structure(pos(22, 20), StructureType::Tower, true);
    if let Some(store) = sandbox.store_mut(&tower) {
        store.add(ResourceType::Energy, 1000);
    }
    let mut memory = Memory::default();
    let hauler = [BodyPart::Carry, BodyPart::Carry, BodyPart::Carry, BodyPart::Carry, BodyPart::Move, BodyPart::Move];
    enlist(&mut sandbox, &mut memory, "h1", pos(20, 20), &hauler, Role::Hauler, None, 200);

    run_tick(&mut sandbox, &mut memory, &HiveConfig::default(), &TaskRegistry::standard());
    assert_eq!(active(&memory, "h1"), Some(("transfer".into(), spawn)));
}

#[test]
fn low_level_controller_wins_over_repair_and_build() {
    let mut sandbox = Sandbox::new();
    sandbox.add_room(ROOM);
    sandbox.set_time(1);
    sandbox.add_spawn(pos(25, 25), 0);
    let controller = sandbox.add_controller(pos(40, 40), 1, 10_000);
    let road = sandbox.add_structure(pos(12, 12), StructureType::Road, true);
    sandbox.set_hits(&road, 10);
    sandbox.add_site(pos(14, 14), StructureType::Extension);
    let mut memory = Memory::default();
    let worker = [BodyPart::Work, BodyPart::Carry, BodyPart::Move];
    enlist(&mut sandbox, &mut memory, "w1", pos(13, 13), &worker, Role::Worker, None, 50);

    run_tick(&mut sandbox, &mut memory, &HiveConfig::default(), &TaskRegistry::standard());
    assert_eq!(active(&memory, "w1"), Some(("upgrade".into(), controller)));
}

#[test]
fn miner_full_next_to_container_transfers() {
    let mut sandbox = room(300);
    let source = sandbox.add_source(pos(10, 10), 3000);
    let container = sandbox.add_structure(pos(11, 10), StructureType::Container, true);
    let mut memory = Memory::default();
    let miner = [BodyPart::Work, BodyPart::Work, BodyPart::Carry, BodyPart::Move];
    enlist(&mut sandbox, &mut memory, "m1", pos(11, 10), &miner, Role::Miner, Some(source), 50);

    run_tick(&mut sandbox, &mut memory, &HiveConfig::default(), &TaskRegistry::standard());
    // Transfer is one-shot: it worked and finished within the tick.
    assert!(sandbox.intents().contains(&Intent::Transfer {
        creep: "m1".into(),
        target: container.clone(),
        resource: ResourceType::Energy,
        amount: 50,
    }));
    assert_eq!(active(&memory, "m1"), None);
    assert_eq!(sandbox.object(&container).unwrap().stored(ResourceType::Energy), 50);
}

// ---------------------------------------------------------------------------
// Population control and output bootstrapping
// ---------------------------------------------------------------------------

#[test]
fn hauler_requested_before_workers() {
    let mut sandbox = room(300);
    sandbox.add_structure(pos(30, 30), StructureType::Container, true);
    let mut memory = Memory::default();

    run_tick(&mut sandbox, &mut memory, &HiveConfig::default(), &TaskRegistry::standard());
    let spawned: Vec<_> = sandbox
        .intents()
        .iter()
        .filter_map(|i| match i {
            Intent::Spawn { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(spawned, vec!["hauler_1".to_string()]);
    assert_eq!(memory.creeps["hauler_1"].role, Role::Hauler);
    assert!(memory.creeps.values().all(|m| m.role != Role::Worker));
}

#[test]
fn stationed_miner_gets_one_container_site() {
    let mut sandbox = room(0);
    let source = sandbox.add_source(pos(10, 10), 3000);
    let mut memory = Memory::default();
    let miner = [BodyPart::Work, BodyPart::Work, BodyPart::Carry, BodyPart::Move];
    enlist(&mut sandbox, &mut memory, "m1", pos(11, 10), &miner, Role::Miner, Some(source), 0);

    for _ in 0..5 {
        tick(&mut sandbox, &mut memory);
    }
    let sites = sandbox.find(ROOM, Find::ConstructionSites);
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].pos, pos(11, 10));
    assert!(matches!(
        sites[0].kind,
        ObjectKind::ConstructionSite {
            structure_type: StructureType::Container,
            ..
        }
    ));
}

#[test]
fn miners_per_source_stay_bounded() {
    let mut sandbox = Sandbox::starter(ROOM, 2);
    let spawn = sandbox
        .find(ROOM, Find::Structures)
        .into_iter()
        .find(|s| s.is_structure(StructureType::Spawn))
        .unwrap()
        .id;
    let sources: Vec<ObjectId> = sandbox.find(ROOM, Find::Sources).into_iter().map(|s| s.id).collect();
    let mut memory = Memory::default();
    let config = HiveConfig::default();

    for _ in 0..60 {
        // Keep the spawn topped up so every request can be met.
        if let Some(store) = sandbox.store_mut(&spawn) {
            store.add(ResourceType::Energy, 300);
        }
        tick(&mut sandbox, &mut memory);
        for source in &sources {
            let assigned = memory
                .creeps
                .values()
                .filter(|m| m.role == Role::Miner && m.assignment == *source)
                .count();
            assert!(assigned <= config.max_miners_per_source, "{assigned} miners on {source}");
        }
    }
    for source in &sources {
        let assigned = memory.creeps.values().filter(|m| m.assignment == *source).count();
        assert_eq!(assigned, config.max_miners_per_source);
    }
    assert!(memory.creeps.values().any(|m| m.role == Role::Hauler));
}

#[test]
fn walled_source_caps_miners_at_open_tiles() {
    let mut sandbox = Sandbox::starter(ROOM, 1);
    let spawn = sandbox
        .find(ROOM, Find::Structures)
        .into_iter()
        .find(|s| s.is_structure(StructureType::Spawn))
        .unwrap()
        .id;
    let source = sandbox.find(ROOM, Find::Sources)[0].clone();
    // Leave only the south-east tile open.
    for dx in -1..=1 {
        for dy in -1..=1 {
            if (dx, dy) != (0, 0) && (dx, dy) != (1, 1) {
                sandbox.set_terrain(&pos(source.pos.x + dx, source.pos.y + dy), Terrain::Wall);
            }
        }
    }
    let mut memory = Memory::default();

    for _ in 0..80 {
        if let Some(store) = sandbox.store_mut(&spawn) {
            store.add(ResourceType::Energy, 300);
        }
        tick(&mut sandbox, &mut memory);
        let assigned = memory
            .creeps
            .values()
            .filter(|m| m.role == Role::Miner && m.assignment == source.id)
            .count();
        assert!(assigned <= 1, "{assigned} miners on a source with one open tile");
    }
    let assigned = memory.creeps.values().filter(|m| m.assignment == source.id).count();
    assert_eq!(assigned, 1);
}

// ---------------------------------------------------------------------------
// Task persistence and chaining
// ---------------------------------------------------------------------------

#[test]
fn unknown_task_falls_back_to_parent() {
    let mut sandbox = room(0);
    let mut memory = Memory::default();
    enlist(&mut sandbox, &mut memory, "w1", pos(5, 5), &[BodyPart::Move], Role::Other("scout".into()), None, 0);
    enlist(&mut sandbox, &mut memory, "w2", pos(6, 5), &[BodyPart::Move], Role::Other("scout".into()), None, 0);

    let mut parent = Task::go_to(pos(30, 5), 0).descriptor();
    parent.drone.name = "w1".into();
    let mut orphan = Task::go_to(pos(30, 5), 0).descriptor();
    orphan.name = "foobar".into();
    let mut chained = orphan.clone();
    chained.parent = Some(Box::new(parent));
    memory.set_task("w1", Some(chained));
    memory.set_task("w2", Some(orphan));

    let config = HiveConfig::default();
    let registry = TaskRegistry::standard();
    let mut game = Game::new(&mut sandbox, &mut memory, &config, &registry);

    let w1 = game.drone("w1").cloned().unwrap();
    let task = w1.task(&game).unwrap();
    assert_eq!(task.kind(), TaskKind::Invalid);
    assert!(!task.is_valid_task(&game));
    assert!(!w1.is_idle(&mut game));
    assert_eq!(game.memory.task_of("w1").unwrap().name, "goto");

    let w2 = game.drone("w2").cloned().unwrap();
    assert!(w2.is_idle(&mut game));
    assert!(game.memory.task_of("w2").is_none());
}

#[test]
fn fork_suspends_and_finish_resumes() {
    let mut sandbox = room(0);
    let ext = sandbox.add_structure(pos(6, 6), StructureType::Extension, true);
    let mut memory = Memory::default();
    enlist(&mut sandbox, &mut memory, "h1", pos(5, 5), &[BodyPart::Carry, BodyPart::Move], Role::Other("scout".into()), None, 50);

    let config = HiveConfig::default();
    let registry = TaskRegistry::standard();
    let mut game = Game::new(&mut sandbox, &mut memory, &config, &registry);
    let h1 = game.drone("h1").cloned().unwrap();
    h1.set_task(&mut game, Some(Task::go_to(pos(40, 5), 1)));

    let current = h1.task(&game).unwrap();
    let ext_obj = game.world.object(&ext).unwrap();
    let mut child = current.fork(Task::transfer(&ext_obj, 1), &mut game);
    let stored = game.memory.task_of("h1").unwrap();
    assert_eq!(stored.name, "transfer");
    assert_eq!(stored.depth(), 2);
    assert_eq!(stored.parent.as_ref().unwrap().name, "goto");

    // Adjacent to the extension: works, and the one-shot transfer hands
    // control back to the suspended goto.
    assert!(child.run(&mut game).unwrap().is_ok());
    assert_eq!(game.memory.task_of("h1").unwrap().name, "goto");
    assert_eq!(game.memory.task_of("h1").unwrap().depth(), 1);
}

#[test]
fn unmanaged_drone_drops_invalid_task_instead_of_running_it() {
    let mut sandbox = room(0);
    let ext = sandbox.add_structure(pos(6, 6), StructureType::Extension, true);
    let mut memory = Memory::default();
    // Nothing to transfer, so the task's preconditions fail.
    enlist(&mut sandbox, &mut memory, "s1", pos(5, 5), &[BodyPart::Carry, BodyPart::Move], Role::Other("scout".into()), None, 0);
    let ext_obj = sandbox.object(&ext).unwrap();
    let mut task = Task::transfer(&ext_obj, 1).descriptor();
    task.drone.name = "s1".into();
    memory.set_task("s1", Some(task));

    run_tick(&mut sandbox, &mut memory, &HiveConfig::default(), &TaskRegistry::standard());
    assert!(memory.task_of("s1").is_none());
    assert_eq!(memory.creeps["s1"].role, Role::Other("scout".into()));
    assert!(!sandbox.intents().iter().any(|i| matches!(i, Intent::Transfer { .. })));
}

#[test]
fn validity_check_is_idempotent() {
    let mut sandbox = room(0);
    let source = sandbox.add_source(pos(10, 10), 3000);
    let mut memory = Memory::default();
    let miner = [BodyPart::Work, BodyPart::Carry, BodyPart::Move];
    enlist(&mut sandbox, &mut memory, "m1", pos(11, 10), &miner, Role::Miner, Some(source.clone()), 0);
    enlist(&mut sandbox, &mut memory, "m2", pos(12, 10), &miner, Role::Miner, Some(source.clone()), 50);

    let config = HiveConfig::default();
    let registry = TaskRegistry::standard();
    let mut game = Game::new(&mut sandbox, &mut memory, &config, &registry);
    let source_obj = game.world.object(&source).unwrap();
    for name in ["m1", "m2"] {
        let drone = game.drone(name).cloned().unwrap();
        drone.set_task(&mut game, Some(Task::harvest(&source_obj, 1)));
    }

    // A holding task: repeated checks agree and leave memory untouched.
    let before = game.memory.clone();
    let mut task = game.drone("m1").cloned().unwrap().task(&game).unwrap();
    assert!(task.is_valid(&mut game));
    assert!(task.is_valid(&mut game));
    assert_eq!(*game.memory, before);

    // A failing task (full carry): the first check clears it, the second
    // agrees and changes nothing further.
    let mut task = game.drone("m2").cloned().unwrap().task(&game).unwrap();
    assert!(!task.is_valid(&mut game));
    let after_first = game.memory.clone();
    assert!(game.memory.task_of("m2").is_none());
    assert!(!task.is_valid(&mut game));
    assert_eq!(*game.memory, after_first);
}

#[test]
fn task_survives_across_ticks() {
    let mut sandbox = room(0);
    let controller = sandbox.find(ROOM, Find::Structures)[1].id.clone();
    let mut memory = Memory::default();
    let worker = [BodyPart::Work, BodyPart::Carry, BodyPart::Move];
    let id = enlist(&mut sandbox, &mut memory, "w1", pos(30, 30), &worker, Role::Worker, None, 50);

    let mut last = sandbox.object(&id).unwrap().pos;
    for _ in 0..5 {
        tick(&mut sandbox, &mut memory);
        assert_eq!(active(&memory, "w1"), Some(("upgrade".into(), controller.clone())));
        let now = sandbox.object(&id).unwrap().pos;
        assert!(now.range_to(&pos(40, 40)) < last.range_to(&pos(40, 40)));
        last = now;
    }
    // Still approaching: nothing spent yet.
    assert_eq!(sandbox.object(&id).unwrap().stored(ResourceType::Energy), 50);
}

// ---------------------------------------------------------------------------
// Memory and determinism
// ---------------------------------------------------------------------------

#[test]
fn memory_round_trips_after_play() {
    let mut sandbox = Sandbox::starter(ROOM, 2);
    let mut memory = Memory::default();
    for _ in 0..60 {
        tick(&mut sandbox, &mut memory);
    }
    assert!(memory.creeps.values().any(|m| m.task.is_some()));
    let json = memory.to_json().unwrap();
    assert_eq!(Memory::from_json(&json).unwrap(), memory);
}

#[test]
fn every_drone_has_at_most_one_chain() {
    let mut sandbox = Sandbox::starter(ROOM, 1);
    let mut memory = Memory::default();
    for _ in 0..120 {
        tick(&mut sandbox, &mut memory);
        for (name, record) in &memory.creeps {
            if let Some(desc) = &record.task {
                assert_eq!(&desc.drone.name, name);
                // Role handlers never fork, so chains stay flat.
                assert_eq!(desc.depth(), 1);
            }
        }
    }
}

#[test]
fn identical_runs_issue_identical_intents() {
    let play = || {
        let mut sandbox = Sandbox::starter(ROOM, 3);
        let mut memory = Memory::default();
        let mut log = Vec::new();
        for _ in 0..150 {
            run_tick(&mut sandbox, &mut memory, &HiveConfig::default(), &TaskRegistry::standard());
            log.extend(sandbox.take_intents());
            sandbox.advance();
        }
        (log, memory.to_json().unwrap())
    };
    let (first_log, first_memory) = play();
    let (second_log, second_memory) = play();
    assert!(!first_log.is_empty());
    assert_eq!(first_log, second_log);
    assert_eq!(first_memory, second_memory);
}
