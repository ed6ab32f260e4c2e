// Pendulum crossings
// Records every passage of a damped pendulum through the vertical, and the turning points where
// the angular velocity changes sign from positive to negative.

use ode_events::*;

type State = Vector2<f64>; // stores angle and angular velocity
type Time = f64;

struct Pendulum {
    length: f64,
    damping: f64,
}

impl System<State> for Pendulum {
    fn system(&self, _t: Time, y: &State, dy: &mut State) {
        dy[0] = y[1];
        dy[1] = -9.81 / self.length * y[0].sin() - self.damping * y[1];
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let system = Pendulum {
        length: 1.0,
        damping: 0.2,
    };
    let grid: Vec<Time> = (0..=400).map(|i| i as f64 * 0.05).collect();
    let vertical: Box<dyn EventFunction<State>> = Box::new(|_t: Time, y: &State| EventValue::new(y[0]));
    let turning: Box<dyn EventFunction<State>> =
        Box::new(|_t: Time, y: &State| EventValue::new(y[1]).direction(Direction::Decreasing));

    let res = integrate(
        system,
        Rk4::new(0.01),
        &grid,
        State::new(1.0, 0.0),
        vec![vertical, turning],
        1.0e-8,
    );

    match res {
        Ok(solution) => {
            println!("{}", solution.stats());
            for event in solution.events() {
                let name = if event.index == 0 { "vertical" } else { "turning point" };
                println!(
                    "t = {:>10.6}  {:<14} angle = {:>9.6}  velocity = {:>9.6}",
                    event.x, name, event.y[0], event.y[1]
                );
            }
        }
        Err(e) => println!("An error occured: {}", e),
    }
}
