use crate::plan::WeeklyPlan;
use crate::volume::VolumeTrend;
use maud::{Markup, html};
use plotters::prelude::*;
use std::path::Path;

trait FormatOption {
    fn fmt_opt(self) -> String;
}

impl FormatOption for Option<f64> {
    fn fmt_opt(self) -> String {
        self.map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "-".into())
    }
}

impl FormatOption for f64 {
    fn fmt_opt(self) -> String {
        format!("{:.1}", self)
    }
}

fn trend_class(trend: VolumeTrend) -> &'static str {
    match trend {
        VolumeTrend::None => "",
        VolumeTrend::Up => "up",
        VolumeTrend::Down => "down",
        VolumeTrend::Flat => "flat",
    }
}

/// Write an HTML summary of the week next to a PNG chart of daily volume.
pub fn export_html_report<P: AsRef<Path>>(path: P, plan: &WeeklyPlan) -> std::io::Result<()> {
    let path = path.as_ref();
    let chart_path = path.with_extension("png");
    let chart_file = match generate_volume_chart(plan, &chart_path) {
        Ok(_) => chart_path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("")),
        Err(e) => {
            log::error!("Failed to generate chart: {}", e);
            std::ffi::OsStr::new("")
        }
    };
    let markup = build_html(plan, chart_file);
    std::fs::write(path, markup.into_string())
}

fn generate_volume_chart(plan: &WeeklyPlan, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, (800, 400)).into_drawing_area();
    root.fill(&WHITE)?;
    let volumes: Vec<f64> = plan.days.iter().map(|d| d.total_volume()).collect();
    let max = volumes.iter().copied().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        root.present()?;
        return Ok(());
    }
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Week {} volume", plan.week_number),
            ("sans-serif", 25),
        )
        .margin(5)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0..volumes.len(), 0f64..max * 1.1)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(volumes.len())
        .x_label_formatter(&|i| {
            plan.days
                .get(*i)
                .map(|d| d.day.short_label().to_string())
                .unwrap_or_default()
        })
        .y_desc("Volume (kg)")
        .draw()?;
    chart.draw_series(volumes.iter().enumerate().map(|(i, v)| {
        Rectangle::new([(i, 0.0), (i + 1, *v)], BLUE.mix(0.6).filled())
    }))?;
    root.present()?;
    Ok(())
}

fn build_html(plan: &WeeklyPlan, chart_file: &std::ffi::OsStr) -> Markup {
    html! {
        html {
            head {
                meta charset="utf-8";
                title { "Week " (plan.week_number) " report" }
                style { ".up{color:#16a34a} .down{color:#dc2626} .flat{color:#ca8a04}" }
            }
            body {
                h1 { "Week " (plan.week_number) ": " (plan.program_name) }
                table border="1" {
                    tr { th { "Training Days" } td { (plan.training_days()) } }
                    tr { th { "Total Volume" } td { (plan.total_volume().fmt_opt()) } }
                }
                @for day in &plan.days {
                    h2 { (day.day.label()) }
                    @if day.is_off_day {
                        p { "Rest day" }
                    } @else {
                        @for exercise in day.active_exercises() {
                            h3 { (exercise.name()) }
                            table border="1" {
                                tr { th { "Set" } th { "Reps" } th { "Actual" } th { "Weight (kg)" } th { "Volume" } th { "Last Week" } }
                                @for (i, set) in exercise.sets().iter().enumerate() {
                                    tr {
                                        td { ({ i + 1 }) }
                                        td { (set.planned_reps()) }
                                        td { (set.actual_reps()) }
                                        td { (set.weight_kg().fmt_opt()) }
                                        td class=(trend_class(set.trend())) { (set.volume().fmt_opt()) " " (set.trend().symbol()) }
                                        td { (set.previous_week_volume().fmt_opt()) }
                                    }
                                }
                            }
                        }
                    }
                }
                h1 { "Daily Volume" }
                @if chart_file.is_empty() {
                    p { "Chart unavailable" }
                } @else {
                    img src=(chart_file.to_string_lossy());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn format_option_for_option_f64() {
        let none: Option<f64> = None;
        assert_eq!(none.fmt_opt(), "-");
        assert_eq!(Some(3.46_f64).fmt_opt(), "3.5");
        assert_eq!(Some(f64::NAN).fmt_opt(), "NaN");
    }

    #[test]
    fn build_html_lists_sets_and_rest_days() {
        let plan = WeeklyPlan::sample();
        let output = build_html(&plan, OsStr::new("week.png")).into_string();

        assert!(output.contains("Week 1: Fat Loss Program"));
        assert!(output.contains("<h3>Squat</h3>"));
        assert!(output.contains("<td>3</td>"), "set numbers start at 1");
        assert!(output.contains("Rest day"));
        assert!(output.contains("<td class=\"up\">960.0 \u{25B2}</td>"));
        assert!(output.contains("<td class=\"down\">800.0 \u{25BC}</td>"));
        assert!(output.contains("<img src=\"week.png\">"));
    }

    #[test]
    fn build_html_handles_empty_chart_file() {
        let plan = WeeklyPlan::new(3, "Empty");
        let output = build_html(&plan, OsStr::new("")).into_string();
        assert!(output.contains("Chart unavailable"));
        assert!(!output.contains("<img"));
    }
}
