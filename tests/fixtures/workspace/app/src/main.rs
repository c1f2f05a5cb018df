fn main() {
    let mut plot = Rectangle { width: 3, height: 4 };
    plot.widen(2);
    println!("{}", plot.area());
}
