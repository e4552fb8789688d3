use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use jigsaw_engine::assembly::{
    AssemblyState, Authority, AuthorityMessage, GrabOutcome, ParticipantId, Placement, Replica,
};
use jigsaw_engine::geom::{MeshDiagnostics, SolidMesh};
use jigsaw_engine::puzzle::{NoiseField, Puzzle, Side};
use jigsaw_engine::{PuzzleConfig, init_logger};

const USAGE: &str = r"puzzle_cli (jigsaw-engine)

USAGE:
  puzzle_cli list
  puzzle_cli generate [options]
  puzzle_cli run <scenario|all>

SCENARIOS:
  merge_pair
  rotation_mismatch
  complete_2x2
  contested_grab

OPTIONS (generate):
  --pieces <n>       Override the piece count
  --config <path>    Read a PuzzleConfig XML document
  --image <path>     Source image; only its size is used (default 400x300)
  --noise <path>     Noise image driving tab/blank choice (default: seeded noise)
  --obj <path>       Write every visual solid to one OBJ file
  --overwrite        Overwrite an existing OBJ file
  -h, --help         Show this help
";

fn main() {
    init_logger();
    if let Err(err) = run() {
        eprintln!("puzzle_cli error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut args = Args::new(args);

    let Some(command) = args.next() else {
        print_usage();
        return Ok(());
    };

    match command.as_str() {
        "list" => {
            for scenario in Scenario::ALL {
                println!("{}", scenario.name());
            }
            Ok(())
        }
        "generate" => cmd_generate(&mut args),
        "run" => cmd_run(&mut args),
        "-h" | "--help" | "help" => {
            print_usage();
            Ok(())
        }
        other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
    }
}

fn print_usage() {
    println!("{USAGE}");
}

fn cmd_generate(args: &mut Args) -> Result<(), String> {
    let mut pieces: Option<usize> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut image_path: Option<PathBuf> = None;
    let mut noise_path: Option<PathBuf> = None;
    let mut obj_path: Option<PathBuf> = None;
    let mut overwrite = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--pieces" => {
                let value = args.value("--pieces")?;
                pieces = Some(
                    value
                        .parse()
                        .map_err(|e| format!("invalid --pieces `{value}`: {e}"))?,
                );
            }
            "--config" => config_path = Some(PathBuf::from(args.value("--config")?)),
            "--image" => image_path = Some(PathBuf::from(args.value("--image")?)),
            "--noise" => noise_path = Some(PathBuf::from(args.value("--noise")?)),
            "--obj" => obj_path = Some(PathBuf::from(args.value("--obj")?)),
            "--overwrite" => overwrite = true,
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
        }
    }

    let mut config = match config_path.as_deref() {
        Some(path) => {
            let xml = fs::read_to_string(path).map_err(|e| format!("read {}: {e}", path.display()))?;
            PuzzleConfig::from_xml_str(&xml).map_err(|e| format!("{}: {e}", path.display()))?
        }
        None => PuzzleConfig::default(),
    };
    if let Some(pieces) = pieces {
        config = config.with_num_pieces(pieces);
    }

    let image_size = match image_path.as_deref() {
        Some(path) => load_image(path)?.dimensions(),
        None => (400, 300),
    };
    let noise = match noise_path.as_deref() {
        Some(path) => NoiseField::from_image(&load_image(path)?),
        None => NoiseField::generate(config.noise_seed, config.noise_width, config.noise_height),
    };

    let puzzle = Puzzle::generate(&config, image_size, &noise).map_err(|e| e.to_string())?;
    let layout = puzzle.layout();
    println!(
        "{} pieces, {} cols x {} rows, size {:.4} x {:.4}",
        puzzle.len(),
        layout.num_cols,
        layout.num_rows,
        puzzle.size().x,
        puzzle.size().y
    );

    let mut total = MeshDiagnostics::new();
    for piece in puzzle.pieces() {
        let collision = MeshDiagnostics::from_mesh(&piece.collision_mesh);
        let types: Vec<String> = Side::ALL
            .iter()
            .map(|side| format!("{:?}", piece.slot(*side).edge_type))
            .collect();
        println!(
            "piece {:>4} at ({:.4}, {:.4}) [{}] visual V:{} T:{} | collision {}",
            piece.id,
            piece.center.x,
            piece.center.y,
            types.join(", "),
            piece.mesh.vertex_count(),
            piece.mesh.triangle_count(),
            collision.summary()
        );
        total.merge(&collision);
    }
    eprintln!("collision total: {}", total.summary());

    if let Some(path) = obj_path.as_deref() {
        write_obj_file(path, &puzzle, overwrite)?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn load_image(path: &Path) -> Result<image::RgbaImage, String> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|e| format!("load {}: {e}", path.display()))
}

/// All visual solids in puzzle space, one OBJ object per piece.
fn write_obj_file(path: &Path, puzzle: &Puzzle, overwrite: bool) -> Result<(), String> {
    if path.exists() && !overwrite {
        return Err(format!(
            "refusing to overwrite existing file {} (use --overwrite)",
            path.display()
        ));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("create dir {}: {e}", parent.display()))?;
    }

    let file = File::create(path).map_err(|e| format!("create {}: {e}", path.display()))?;
    let mut w = BufWriter::new(file);
    writeln!(w, "# jigsaw-engine puzzle_cli").map_err(|e| format!("write obj: {e}"))?;

    let mut base = 1u32;
    for piece in puzzle.pieces() {
        let mesh = &piece.mesh;
        mesh.validate()
            .map_err(|e| format!("piece {} mesh validation failed: {e}", piece.id))?;
        write_piece(&mut w, piece.id, piece.center.to_array(), mesh, base)
            .map_err(|e| format!("write obj: {e}"))?;
        base += mesh.vertex_count() as u32;
    }

    w.flush().map_err(|e| format!("flush {}: {e}", path.display()))
}

fn write_piece(
    w: &mut impl Write,
    id: usize,
    center: [f64; 2],
    mesh: &SolidMesh,
    base: u32,
) -> std::io::Result<()> {
    writeln!(w, "o piece_{id}")?;
    for p in &mesh.positions {
        writeln!(w, "v {} {} {}", p[0] + center[0], p[1] + center[1], p[2])?;
    }
    if let Some(uvs) = mesh.uvs.as_ref() {
        for uv in uvs {
            writeln!(w, "vt {} {}", uv[0], uv[1])?;
        }
    }
    if let Some(normals) = mesh.normals.as_ref() {
        for n in normals {
            writeln!(w, "vn {} {} {}", n[0], n[1], n[2])?;
        }
    }

    let has_uvs = mesh.uvs.is_some();
    let has_normals = mesh.normals.is_some();
    for tri in mesh.indices.chunks_exact(3) {
        let a = tri[0] + base;
        let b = tri[1] + base;
        let c = tri[2] + base;
        match (has_uvs, has_normals) {
            (true, true) => writeln!(w, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}"),
            (true, false) => writeln!(w, "f {a}/{a} {b}/{b} {c}/{c}"),
            (false, true) => writeln!(w, "f {a}//{a} {b}//{b} {c}//{c}"),
            (false, false) => writeln!(w, "f {a} {b} {c}"),
        }?;
    }
    Ok(())
}

fn cmd_run(args: &mut Args) -> Result<(), String> {
    let name = args.next().ok_or("missing scenario name")?;
    if name == "all" {
        for scenario in Scenario::ALL {
            run_scenario(*scenario)?;
        }
        return Ok(());
    }
    let scenario = Scenario::from_str(&name).ok_or_else(|| {
        let names: Vec<&str> = Scenario::ALL.iter().map(|s| s.name()).collect();
        format!("unknown scenario `{name}` (expected one of: {})", names.join(", "))
    })?;
    run_scenario(scenario)
}

#[derive(Debug, Clone, Copy)]
enum Scenario {
    MergePair,
    RotationMismatch,
    Complete2x2,
    ContestedGrab,
}

impl Scenario {
    const ALL: &'static [Scenario] = &[
        Scenario::MergePair,
        Scenario::RotationMismatch,
        Scenario::Complete2x2,
        Scenario::ContestedGrab,
    ];

    fn name(self) -> &'static str {
        match self {
            Scenario::MergePair => "merge_pair",
            Scenario::RotationMismatch => "rotation_mismatch",
            Scenario::Complete2x2 => "complete_2x2",
            Scenario::ContestedGrab => "contested_grab",
        }
    }

    fn from_str(name: &str) -> Option<Self> {
        Scenario::ALL.iter().copied().find(|s| s.name() == name)
    }
}

const ALICE: ParticipantId = ParticipantId(1);
const BOB: ParticipantId = ParticipantId(2);

/// A 2x2 puzzle with every piece pushed out to three times its solved
/// center, so no two pieces fit yet.
fn scenario_table() -> Result<(Puzzle, Authority), String> {
    let config = PuzzleConfig::default().with_num_pieces(4);
    let puzzle = Puzzle::generate(&config, (100, 100), &NoiseField::generate(7, 8, 8))
        .map_err(|e| e.to_string())?;
    let state = AssemblyState::from_placements(
        puzzle
            .pieces()
            .iter()
            .map(|piece| Placement::at(piece.center * 3.0))
            .collect(),
    );
    let authority = Authority::new(&puzzle, state);
    Ok((puzzle, authority))
}

/// Grab `piece`, move its cluster so `piece` lands on `target`, release.
fn drop_piece(
    authority: &mut Authority,
    who: ParticipantId,
    piece: usize,
    target: Placement,
) -> Result<(), String> {
    let cluster = match authority.on_grab_requested(who, piece).map_err(|e| e.to_string())? {
        GrabOutcome::Granted { cluster } => cluster,
        GrabOutcome::Rejected { cluster, holder } => {
            println!("  {who}: grab of {cluster} rejected, held by {holder}");
            return Ok(());
        }
    };
    let current = authority
        .state()
        .piece_placement(piece)
        .ok_or_else(|| format!("piece {piece} has no placement"))?;
    let cluster_placement = authority
        .state()
        .cluster(cluster)
        .map(|c| c.placement)
        .ok_or_else(|| format!("{cluster} vanished"))?;
    let local = cluster_placement.relative(current);
    // Solve for the cluster placement that puts `piece` on `target`.
    let rotation = target.rotation_deg - local.rotation_deg;
    let placement = Placement::new(
        target.position - local.position.rotated_deg(rotation),
        rotation,
    );

    authority
        .on_external_transform_update(who, cluster, placement)
        .map_err(|e| e.to_string())?;
    let outcome = authority
        .on_release_requested(who, cluster)
        .map_err(|e| e.to_string())?;
    println!(
        "  {who} dropped piece {piece}: anchor {}, merged {:?}",
        outcome.anchor, outcome.merged
    );
    Ok(())
}

/// Where `piece` belongs next to `other`, given `other`'s current placement.
fn beside(puzzle: &Puzzle, authority: &Authority, piece: usize, other: usize) -> Result<Placement, String> {
    let anchor = authority
        .state()
        .piece_placement(other)
        .ok_or_else(|| format!("piece {other} has no placement"))?;
    let offset = puzzle.piece(piece).map_err(|e| e.to_string())?.center
        - puzzle.piece(other).map_err(|e| e.to_string())?.center;
    Ok(Placement::new(anchor.apply(offset), anchor.rotation_deg))
}

fn run_scenario(scenario: Scenario) -> Result<(), String> {
    println!("== {}", scenario.name());
    let (puzzle, mut authority) = scenario_table()?;
    let mut replica = Replica::new(BOB, authority.state().clone(), authority.seq());

    match scenario {
        Scenario::MergePair => {
            let target = beside(&puzzle, &authority, 0, 1)?;
            drop_piece(&mut authority, ALICE, 0, target)?;
        }
        Scenario::RotationMismatch => {
            let mut target = beside(&puzzle, &authority, 0, 1)?;
            target.rotation_deg += 20.0;
            drop_piece(&mut authority, ALICE, 0, target)?;
        }
        Scenario::Complete2x2 => {
            for (piece, other) in [(0, 1), (2, 0), (3, 2)] {
                let target = beside(&puzzle, &authority, piece, other)?;
                drop_piece(&mut authority, ALICE, piece, target)?;
            }
            authority
                .tick(u64::from(u32::MAX))
                .map_err(|e| e.to_string())?;
        }
        Scenario::ContestedGrab => {
            authority
                .on_grab_requested(ALICE, 2)
                .map_err(|e| e.to_string())?;
            let target = beside(&puzzle, &authority, 3, 2)?;
            drop_piece(&mut authority, BOB, 3, target)?;
            authority
                .on_participant_disconnected(ALICE)
                .map_err(|e| e.to_string())?;
        }
    }

    let messages = authority.drain_messages();
    for message in &messages {
        print_message(message);
        replica.apply(message).map_err(|e| e.to_string())?;
    }

    let state = authority.state();
    println!(
        "  {} live clusters, complete: {}, replica in sync: {}",
        state.live_cluster_count(),
        state.is_complete(),
        replica.state() == state
    );
    Ok(())
}

fn print_message(message: &AuthorityMessage) {
    let source = message
        .source
        .map_or_else(|| "authority".to_string(), |p| p.to_string());
    println!("  #{:<4} {source:<14} {:?}", message.seq, message.event);
}

struct Args {
    args: Vec<String>,
    pos: usize,
}

impl Args {
    fn new(args: Vec<String>) -> Self {
        Self { args, pos: 0 }
    }

    fn next(&mut self) -> Option<String> {
        let arg = self.args.get(self.pos)?.clone();
        self.pos += 1;
        Some(arg)
    }

    fn value(&mut self, flag: &str) -> Result<String, String> {
        self.next().ok_or_else(|| format!("missing value for {flag}"))
    }
}
