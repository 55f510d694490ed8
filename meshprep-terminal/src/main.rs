/// meshprep-view - inspect or spin a mesh in the terminal
///
/// Controls:
///   - WASD / Arrow Keys: Rotate the mesh
///   - E/R: Roll rotation
///   - Q/ESC: Quit
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::info;
use meshprep_core::{IndexWalk, MeshData};
use meshprep_terminal::{Report, TerminalApp, ViewerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliWalk {
    /// Overlapping index windows
    Sliding,
    /// Disjoint index triples
    Triangles,
}

impl From<CliWalk> for IndexWalk {
    fn from(walk: CliWalk) -> Self {
        match walk {
            CliWalk::Sliding => IndexWalk::Sliding,
            CliWalk::Triangles => IndexWalk::Triangles,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "meshprep-view",
    about = "Build a mesh with meshprep and show it in the terminal",
    version
)]
struct Args {
    /// OBJ file to load; the built-in cube is used when omitted.
    file: Option<PathBuf>,

    /// Store texture V as 1 - v.
    #[arg(long)]
    flip_v: bool,

    /// Do not read material libraries.
    #[arg(long)]
    no_materials: bool,

    /// How indices are grouped for tangent accumulation.
    #[arg(long, value_enum)]
    walk: Option<CliWalk>,

    /// TOML file with viewer settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print a report about the built mesh and exit.
    #[arg(long)]
    inspect: bool,

    /// Exit after rendering N frames.
    #[arg(long)]
    max_frames: Option<u64>,
}

impl Args {
    fn viewer_config(&self) -> Result<ViewerConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::load(path)?,
            None => ViewerConfig::default(),
        };
        if self.flip_v {
            config.load.flip_v = true;
        }
        if self.no_materials {
            config.load.load_textures = false;
        }
        if let Some(walk) = self.walk {
            config.load.tangents.walk = walk.into();
        }
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Log lines would tear the frame in the render loop
    let default_filter = if args.inspect { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let config = args.viewer_config()?;
    let (title, data) = match &args.file {
        Some(path) => (path.display().to_string(), MeshData::from_file(path, &config.load)?),
        None => ("cube".to_string(), MeshData::cube(2.0)),
    };
    info!("built {} vertices and {} indices", data.vertex_count(), data.index_count());

    if args.inspect {
        print!("{}", Report::new(title, &data));
        return Ok(());
    }

    let mut app = TerminalApp::new(data, title, &config)?.with_max_frames(args.max_frames);
    app.run()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from(["meshprep-view", "mesh.obj", "--flip-v", "--no-materials", "--walk", "triangles"]);
        let config = args.viewer_config().unwrap();
        assert_eq!(args.file, Some(PathBuf::from("mesh.obj")));
        assert!(config.load.flip_v);
        assert!(!config.load.load_textures);
        assert_eq!(config.load.tangents.walk, IndexWalk::Triangles);
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["meshprep-view"]);
        let config = args.viewer_config().unwrap();
        assert!(args.file.is_none());
        assert!(!args.inspect);
        assert_eq!(config, ViewerConfig::default());
    }
}
