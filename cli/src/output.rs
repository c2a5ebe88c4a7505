use pd_floorplan::{Block, Placement};
use pd_partition::{BlockTag, FmPartitioner};
use pd_pathfinder::PathOutcome;
use pd_router::RoutingResult;
use std::fmt::Write;

pub fn format_partition(fm: &FmPartitioner) -> String {
    let mut out = String::new();
    writeln!(out, "Cutsize = {}", fm.cut_size()).unwrap();
    for (tag, label) in [(BlockTag::A, "G1"), (BlockTag::B, "G2")] {
        let cells = fm.cells_in(tag);
        writeln!(out, "{} {}", label, cells.len()).unwrap();
        for cell in &cells {
            write!(out, "{} ", fm.netlist().cells[cell.index()].name).unwrap();
        }
        writeln!(out, ";").unwrap();
    }
    out
}

/// One block per line in input order; the format forbids the end-of-file
/// newline.
pub fn format_floorplan(blocks: &[Block], placement: &Placement) -> String {
    let mut out = String::new();
    writeln!(out, "A = {}", placement.area).unwrap();
    writeln!(
        out,
        "R = {}",
        placement.width as f64 / placement.height as f64
    )
    .unwrap();
    let lines: Vec<String> = blocks
        .iter()
        .zip(&placement.coords)
        .map(|(block, point)| format!("{} {} {}", block.name, point.x, point.y))
        .collect();
    out.push_str(&lines.join("\n"));
    out
}

/// Net-by-net track report. In-channel tracks number from the bottom up;
/// no end-of-file newline.
pub fn format_routing(result: &RoutingResult) -> String {
    let mut placed: Vec<Option<(char, usize, i64, i64)>> = Vec::new();
    let mut record = |tag: char, number: usize, track: &pd_router::Track| {
        for &(interval, net) in track {
            if placed.len() <= net as usize {
                placed.resize(net as usize + 1, None);
            }
            placed[net as usize] = Some((tag, number, interval.lo, interval.hi));
        }
    };
    for (i, track) in result.top_tracks.iter().enumerate() {
        record('T', i, track);
    }
    let depth = result.tracks.len();
    for (i, track) in result.tracks.iter().enumerate() {
        record('C', depth - i, track);
    }
    for (i, track) in result.bottom_tracks.iter().enumerate() {
        record('B', i, track);
    }

    let mut out = String::new();
    writeln!(out, "Channel density: {}", result.channel_density()).unwrap();
    let lines: Vec<String> = placed
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(net, slot)| {
            slot.map(|(tag, number, lo, hi)| format!("Net {}\n{}{} {} {}", net, tag, number, lo, hi))
        })
        .collect();
    out.push_str(&lines.join("\n"));
    out
}

pub fn format_path(outcome: &PathOutcome) -> String {
    let mut out = String::new();
    writeln!(out, "{}", outcome.hpwl).unwrap();
    for names in [
        &outcome.p_mos_names,
        &outcome.p_net_names,
        &outcome.n_mos_names,
        &outcome.n_net_names,
    ] {
        writeln!(out, "{}", names.join(" ")).unwrap();
    }
    out
}
