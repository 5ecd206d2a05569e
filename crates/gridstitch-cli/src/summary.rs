use console::Style;
use gridstitch_core::align::{AxisEstimate, ShiftSource};
use gridstitch_core::pipeline::config::StitchConfig;
use gridstitch_core::pipeline::{PreparedStitch, StitchReport};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!(
        "  {}",
        s.title
            .apply_to("\u{2550}".repeat(title.chars().count()))
    );
    println!();
}

pub fn print_run_summary(config: &StitchConfig) {
    let s = Styles::new();
    print_title(&s, "Grid Stitch");

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(config.input.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output_file_name())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Format"),
        s.method.apply_to(config.format)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Memory"),
        s.method.apply_to(config.memory)
    );
    println!();

    println!("  {}", s.header.apply_to("Registration"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Channel"),
        s.value
            .apply_to(config.registration.channel.as_deref().unwrap_or("first"))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Z-level"),
        s.value.apply_to(config.registration.z_level)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Upsample"),
        s.value
            .apply_to(format!("{}x", config.registration.upsample_factor))
    );
    println!();

    if config.flatfield.enabled {
        println!("  {}", s.header.apply_to("Flatfield"));
        println!(
            "    {:<12}{}",
            s.label.apply_to("Samples"),
            s.value.apply_to(config.flatfield.sample_count)
        );
        if let Some(seed) = config.flatfield.seed {
            println!("    {:<12}{}", s.label.apply_to("Seed"), s.value.apply_to(seed));
        }
    } else {
        println!(
            "  {:<14}{}",
            s.header.apply_to("Flatfield"),
            s.disabled.apply_to("disabled")
        );
    }
    println!();
}

pub fn print_acquisition_info(prepared: &PreparedStitch) {
    let s = Styles::new();
    print_title(&s, "Acquisition");

    let dims = prepared.grid.dims();
    let geometry = prepared.grid.geometry();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Images"),
        s.path.apply_to(prepared.layout.image_dir.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Naming"),
        s.method.apply_to(prepared.grid.layout())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Tiles"),
        s.value.apply_to(format!(
            "{} ({} rows x {} cols x {} z x {} channels)",
            prepared.grid.len(),
            dims.num_rows,
            dims.num_cols,
            dims.num_z,
            dims.num_channels
        ))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Tile size"),
        s.value.apply_to(format!(
            "{}x{} {}",
            geometry.width, geometry.height, geometry.sample_type
        ))
    );
    println!();

    println!("  {}", s.header.apply_to("Channels"));
    for (i, name) in prepared.grid.channel_names().iter().enumerate() {
        println!("    {}. {}", s.label.apply_to(i + 1), s.value.apply_to(name));
    }
    println!();

    if !prepared.modes.is_empty() {
        println!("  {}", s.header.apply_to("Selected modes"));
        for mode in &prepared.modes {
            println!(
                "    {:<12}{}",
                s.label.apply_to(&mode.id),
                s.value.apply_to(mode.name.as_deref().unwrap_or("-"))
            );
        }
        println!();
    }

    let orientation = prepared.orientation;
    println!("  {}", s.header.apply_to("Orientation"));
    for (label, reversed) in [
        ("Rows", orientation.rows_reversed),
        ("Columns", orientation.cols_reversed),
        ("Z", orientation.z_reversed),
    ] {
        println!(
            "    {:<12}{}",
            s.label.apply_to(label),
            s.value
                .apply_to(if reversed { "reversed" } else { "forward" })
        );
    }
    println!();

    print_shifts(&s, prepared);

    let plan = prepared.plan;
    println!("  {}", s.header.apply_to("Canvas"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Shape"),
        s.value.apply_to(plan.shape)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Full size"),
        s.value.apply_to(format_bytes(plan.full_size_bytes()))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Estimate"),
        s.value.apply_to(format_bytes(plan.memory_estimate_bytes))
    );
    println!();
}

fn print_shifts(s: &Styles, prepared: &PreparedStitch) {
    let overlap = &prepared.overlap;
    println!("  {}", s.header.apply_to("Overlap"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Pixel size"),
        s.value.apply_to(format!("{:.4} um", overlap.pixel_size_um))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Reference"),
        s.value.apply_to(format!(
            "i:{} j:{}",
            overlap.reference.row, overlap.reference.col
        ))
    );
    print_axis(s, "Vertical", &overlap.vertical);
    print_axis(s, "Horizontal", &overlap.horizontal);
    println!();
}

fn print_axis(s: &Styles, label: &str, axis: &AxisEstimate) {
    match &axis.source {
        ShiftSource::Measured => println!(
            "    {:<12}{} {}",
            s.label.apply_to(label),
            s.value.apply_to(axis.shift),
            s.method.apply_to(format!("overlap {} px", axis.nominal_overlap))
        ),
        ShiftSource::Defaulted(reason) => println!(
            "    {:<12}{} {}",
            s.label.apply_to(label),
            s.value.apply_to(axis.shift),
            s.disabled.apply_to(reason)
        ),
    }
}

pub fn print_report(report: &StitchReport) {
    let s = Styles::new();
    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Canvas"),
        s.value.apply_to(report.plan.shape)
    );
    println!(
        "  {:<14}{} / {}",
        s.label.apply_to("Shifts"),
        s.value.apply_to(report.overlap.vertical.shift),
        s.value.apply_to(report.overlap.horizontal.shift)
    );
    if report.memory_mapped {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Storage"),
            s.method.apply_to("memory-mapped")
        );
    }
    println!(
        "\n  Output saved to {}",
        s.path.apply_to(report.output.display())
    );
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
