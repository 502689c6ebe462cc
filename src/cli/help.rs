use colored::Colorize;
use std::io::{self, Write};

pub struct RenderOpts {
    pub show_examples: bool,
}

impl Default for RenderOpts {
    fn default() -> Self {
        RenderOpts {
            show_examples: true,
        }
    }
}

pub fn render_help<W: Write>(mut out: W, opts: &RenderOpts) -> io::Result<()> {
    writeln!(out, "{}", "Ruptura - Help".bold())?;
    writeln!(out)?;

    writeln!(out, "{}  ruptura <command> [options]", "Usage:".bold())?;
    writeln!(out)?;

    writeln!(out, "{}", "Inspect spreadsheets:".bold())?;
    writeln!(out, "  {:32} - List the known layouts", "models")?;
    writeln!(out, "  {:32} - Identify a spreadsheet", "detect <file>")?;
    writeln!(
        out,
        "  {:32} - Summary and preview of one file",
        "extract <file> [--export out.xlsx]"
    )?;

    writeln!(out)?;
    writeln!(out, "{}", "Reports:".bold())?;
    writeln!(
        out,
        "  {:32} - Stockout report (filters, JSON and export)",
        "reconcile --stock F --curve F"
    )?;
    writeln!(
        out,
        "  {:32} - Catalog report: ruptura, dados_combinados, exemplo",
        "report <files...> [--kind K]"
    )?;
    writeln!(out, "  {:32} - Group → buyer mapping", "buyers [--buyer NAME]")?;

    writeln!(out)?;
    if opts.show_examples {
        writeln!(out, "{}", "Examples:".bold())?;
        writeln!(out, "  ruptura detect curva_abc.xlsx")?;
        writeln!(
            out,
            "  ruptura reconcile --stock estoque.xlsx --curve curva.xlsx --filter RUPTURA=RUPTURA"
        )?;
        writeln!(
            out,
            "  ruptura reconcile --stock estoque.xlsx --curve curva.xlsx --stores emporio --export ."
        )?;
        writeln!(out, "  ruptura buyers --buyer Glacirene")?;
        writeln!(out)?;
    }

    writeln!(out, "Set RUST_LOG=info to see what each step is doing.")?;
    Ok(())
}
