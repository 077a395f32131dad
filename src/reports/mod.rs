use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use scroll_timing::refresh_rate::RefreshRates;
use scroll_timing::{ScrollTimingEntry, StResult};
use serde::Serialize;
use std::io::Write;

pub fn print_entries_table(entries: &[ScrollTimingEntry]) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Source").add_attribute(Attribute::Bold),
        Cell::new("Start"),
        Cell::new("Latency").fg(Color::Cyan),
        Cell::new("Duration"),
        Cell::new("Frames"),
        Cell::new("Expected"),
        Cell::new("Smooth").fg(Color::Green),
        Cell::new("dX"),
        Cell::new("dY"),
        Cell::new("Target"),
    ]);

    for i in 2..=9 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    for (i, e) in entries.iter().enumerate() {
        let smooth = e.smoothness();
        let smooth_color = if smooth >= 0.9 {
            Color::Green
        } else if smooth >= 0.6 {
            Color::Yellow
        } else {
            Color::Red
        };
        let target = e
            .target()
            .map(|n| format!("#{}", n.0))
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(e.scroll_source()).add_attribute(Attribute::Bold),
            Cell::new(format!("{:.1}", e.start_time())),
            Cell::new(format!("{:.1}", e.scroll_start_latency())).fg(Color::Cyan),
            Cell::new(format!("{:.1}", e.duration())),
            Cell::new(e.frames_produced()),
            Cell::new(e.frames_expected()),
            Cell::new(format!("{:.0}%", smooth * 100.0)).fg(smooth_color),
            Cell::new(format!("{:.0}", e.delta_x())),
            Cell::new(format!("{:.0}", e.delta_y())),
            Cell::new(target),
        ]);
    }
    println!("{}", table);
}

pub fn print_summary(entries: &[ScrollTimingEntry], rates: &RefreshRates) {
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);

    let count = entries.len();
    let mean = |f: &dyn Fn(&ScrollTimingEntry) -> f64| {
        if count == 0 {
            0.0
        } else {
            entries.iter().map(f).sum::<f64>() / count as f64
        }
    };
    let produced: u64 = entries.iter().map(|e| e.frames_produced() as u64).sum();
    let expected: u64 = entries.iter().map(|e| e.frames_expected() as u64).sum();

    table.add_row(vec![Cell::new("Gestures"), Cell::new(count)]);
    table.add_row(vec![
        Cell::new("Mean start latency"),
        Cell::new(format!("{:.1} ms", mean(&|e| e.scroll_start_latency()))),
    ]);
    table.add_row(vec![
        Cell::new("Mean duration"),
        Cell::new(format!("{:.1} ms", mean(&|e| e.duration()))),
    ]);
    table.add_row(vec![
        Cell::new("Frames produced / expected"),
        Cell::new(format!("{} / {}", produced, expected)),
    ]);
    table.add_row(vec![
        Cell::new("Mean smoothness"),
        Cell::new(format!("{:.1}%", mean(&|e| e.smoothness()) * 100.0)),
    ]);
    table.add_row(vec![
        Cell::new("Baseline rate"),
        Cell::new(format!("{:.2} Hz", rates.baseline)),
    ]);
    table.add_row(vec![
        Cell::new("Main thread rate"),
        Cell::new(format!("{:.2} Hz", rates.main_thread)),
    ]);

    if let Some(col) = table.column_mut(1) {
        col.set_cell_alignment(CellAlignment::Right);
    }
    println!("\n📊 === SUMMARY === 📊");
    println!("{}", table);
}

pub fn write_json<W: Write>(entries: &[ScrollTimingEntry], mut out: W) -> StResult<()> {
    serde_json::to_writer_pretty(&mut out, entries)?;
    writeln!(out)?;
    Ok(())
}

#[derive(Serialize)]
struct CsvRow {
    scroll_source: String,
    start_time: f64,
    first_frame_time: f64,
    scroll_start_latency: f64,
    duration: f64,
    frames_expected: u32,
    frames_produced: u32,
    checkerboard_time: f64,
    delta_x: f64,
    delta_y: f64,
    target: Option<u64>,
}

pub fn write_csv<W: Write>(entries: &[ScrollTimingEntry], out: W) -> StResult<()> {
    let mut writer = csv::Writer::from_writer(out);
    for e in entries {
        writer.serialize(CsvRow {
            scroll_source: e.scroll_source().to_string(),
            start_time: e.start_time(),
            first_frame_time: e.first_frame_time(),
            scroll_start_latency: e.scroll_start_latency(),
            duration: e.duration(),
            frames_expected: e.frames_expected(),
            frames_produced: e.frames_produced(),
            checkerboard_time: e.checkerboard_time(),
            delta_x: e.delta_x(),
            delta_y: e.delta_y(),
            target: e.target().map(|n| n.0),
        })?;
    }
    writer.flush()?;
    Ok(())
}
