use clap::{Parser, Subcommand};
use colored::*;
use debug_print::*;
use h264cabac::binary_reader::BinaryReader;
use h264cabac::binary_writer::BinaryWriter;
use h264cabac::cabac_reader::*;
use h264cabac::cabac_writer::*;
use h264cabac::error::*;
use h264cabac::neighbour::*;
use h264cabac::slice_header::*;
use h264cabac::trace::*;
use std::fs;
use std::io;
use std::process;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Code the elements of a trace into CABAC slice data
    Encode {
        /// Path to element trace
        #[clap(short, long)]
        trace: String,
        /// Path to output slice data ("-" for stdout)
        #[clap(short, long)]
        output: String,
        #[clap(flatten)]
        slice: SliceArgs,
    },
    /// Decode the elements named by a trace from CABAC slice data
    Decode {
        /// Path to element trace
        #[clap(short, long)]
        trace: String,
        /// Path to input slice data ("-" for stdin)
        #[clap(short, long)]
        input: String,
        /// Compare decoded values with the trace
        #[clap(long)]
        verify: bool,
        #[clap(flatten)]
        slice: SliceArgs,
    },
}

#[derive(clap::Args, Debug)]
struct SliceArgs {
    /// Slice type (P, B, I, SP or SI)
    #[clap(long, default_value = "I")]
    slice_type: SliceType,
    /// SliceQPY
    #[clap(long, default_value_t = 26, allow_hyphen_values = true)]
    qp: i32,
    /// cabac_init_idc for P, SP and B slices
    #[clap(long, default_value_t = 0)]
    cabac_init_idc: usize,
    /// ChromaArrayType (0: monochrome or separate planes, 1: 4:2:0, 2: 4:2:2, 3: 4:4:4)
    #[clap(long, default_value_t = 1)]
    chroma_array_type: usize,
}

impl SliceArgs {
    fn slice_header(&self) -> SliceHeader {
        let mut sh = SliceHeader::new(self.slice_type, self.qp);
        sh.cabac_init_idc = self.cabac_init_idc;
        sh.chroma_array_type = self.chroma_array_type;
        sh
    }
}

fn load_trace(path: &str) -> Result<Vec<TraceEntry>> {
    let text = fs::read_to_string(path)?;
    parse_trace(&text)
}

fn encode(trace: &str, output: &str, slice: &SliceArgs) -> Result<()> {
    let mut entries = load_trace(trace)?;
    if !entries.last().map_or(false, |entry| entry.is_end_of_slice()) {
        let line = entries.last().map_or(0, |entry| entry.line) + 1;
        entries.push(TraceEntry::end_of_slice(line));
    }

    let stdout = io::stdout();
    let sink = if output == "-" {
        BinaryWriter::standard(&stdout)
    } else {
        BinaryWriter::file(output)?
    };
    let nb = NeighbourSnapshot::unavailable();
    let mut writer = CabacWriter::new(sink, slice.slice_header())?;
    for entry in entries.iter() {
        encode_entry(&mut writer, &nb, entry)?;
    }
    debug_eprintln!("{} elements in {} bins", entries.len(), writer.bin_count());
    let mut sink = writer.finish()?;
    sink.flush()
}

/// Returns the number of mismatches.
fn decode(trace: &str, input: &str, verify: bool, slice: &SliceArgs) -> Result<usize> {
    let entries = load_trace(trace)?;
    let stdin = io::stdin();
    let source = if input == "-" {
        BinaryReader::standard(&stdin)
    } else {
        BinaryReader::file(input)?
    };
    let sh = slice.slice_header();
    let num_c8x8 = sh.num_c8x8();
    let nb = NeighbourSnapshot::unavailable();
    let mut reader = CabacReader::new(source, sh)?;
    let mut mismatches = 0;
    for entry in entries.iter() {
        let decoded = entry.with_values(decode_entry(&mut reader, &nb, entry)?);
        if verify && decoded.values != entry.padded_values(num_c8x8)? {
            mismatches += 1;
            println!(
                "{} (line {}: expected {})",
                decoded.to_string().red(),
                entry.line,
                entry
            );
        } else {
            println!("{}", decoded);
        }
        if reader.state() == SliceDataState::Finished {
            break;
        }
    }
    Ok(mismatches)
}

fn main() {
    let args = Args::parse();

    let result = match &args.command {
        Command::Encode {
            trace,
            output,
            slice,
        } => encode(trace, output, slice).map(|_| 0),
        Command::Decode {
            trace,
            input,
            verify,
            slice,
        } => decode(trace, input, *verify, slice),
    };

    match result {
        Ok(0) => {}
        Ok(mismatches) => {
            eprintln!("{}: {} mismatching elements", "error".red(), mismatches);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red(), e);
            process::exit(1);
        }
    }
}
