// A bouncing ball example
// Each flight ends on a terminal ground event; the state at impact seeds the next flight.

use std::{
    fs::{create_dir_all, File},
    io::BufWriter,
    io::Write,
    path::Path,
};

use ode_events::*;

type State = Vector2<f64>; // stores height and velocity
type Time = f64;

const G: f64 = 9.81; // gravity constant on earth
const BOUNCE: f64 = 0.75;
const MAX_BOUNCES: u32 = 5;
const DT: f64 = 0.05;

struct BouncingBall;

impl System<State> for BouncingBall {
    fn system(&self, _t: Time, y: &State, dy: &mut State) {
        dy[0] = y[1]; // location is changed by v
        dy[1] = -G; // v is changed by acc of gravity
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    // Initial state: At 10m with zero velocity
    let mut y0 = State::new(10.0, 0.);
    let mut t0 = 0.0;
    let mut times = Vec::new();
    let mut states = Vec::new();

    for bounce in 0..MAX_BOUNCES {
        let grid: Vec<Time> = (0..=200).map(|i| t0 + i as f64 * DT).collect();
        let ground = |_t: Time, y: &State| {
            EventValue::new(y[0])
                .terminal(true)
                .direction(Direction::Decreasing)
        };

        // Use comments to see differences with Rk4
        //let mut driver = EventDriver::new(BouncingBall, Rk4::new(0.01), grid, y0).event(ground);
        let mut driver =
            EventDriver::new(BouncingBall, Dopri5::new(1.0e-8, 1.0e-8), grid, y0).event(ground);

        match driver.integrate() {
            Ok(stats) => println!("{}", stats),
            Err(e) => {
                println!("An error occurred: {}", e);
                return;
            }
        }

        let solution = driver.into_results();
        let impact = match solution.events().last() {
            Some(event) if solution.terminated() => event.clone(),
            _ => {
                println!("The ball did not reach the ground.");
                break;
            }
        };
        println!("Bounce {} at t = {:.6}: {:?}", bounce + 1, impact.x, impact.y);

        let (t_out, y_out) = solution.get();
        times.extend_from_slice(t_out);
        states.extend_from_slice(y_out);

        t0 = impact.x;
        y0 = State::new(0.0, -BOUNCE * impact.y[1]);
    }

    let path = Path::new("./outputs/bouncing_ball.dat");
    save(&times, &states, path);
}

pub fn save(times: &[Time], states: &[State], filename: &Path) {
    // Create or open file
    if let Some(dir) = filename.parent() {
        if let Err(e) = create_dir_all(dir) {
            println!("Could not create directory. Error: {:?}", e);
            return;
        }
    }
    let file = match File::create(filename) {
        Err(e) => {
            println!("Could not open file. Error: {:?}", e);
            return;
        }
        Ok(buf) => buf,
    };
    let mut buf = BufWriter::new(file);

    // Write time and state vector in a csv format
    for (t, state) in times.iter().zip(states) {
        let mut line = format!("{}", t);
        for val in state.iter() {
            line.push_str(&format!(", {}", val));
        }
        if let Err(e) = writeln!(buf, "{}", line) {
            println!("Could not write to file. Error: {:?}", e);
            return;
        }
    }
    if let Err(e) = buf.flush() {
        println!("Could not write to file. Error: {:?}", e);
    }
}
