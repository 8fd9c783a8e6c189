use rsc::Randomizer;

fn main() {
    let mut rnd: Randomizer = Randomizer::from_seed(200900);
    for _ in 0..2000 {
        println!("{:.2}", rnd.gen());
    }
}
